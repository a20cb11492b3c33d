// SPDX-License-Identifier: PMPL-1.0-or-later
//! WCAG reference table.
//!
//! The catalogue is an immutable value handed to the rule engine and the
//! reporter explicitly. Severities are not part of it: they are fixed per
//! category by [`Category::severity`]. [`Catalogue::standard`] is what the bot ships with;
//! tests can build an alternate table with [`Catalogue::with_entry`].

use crate::issue::{Category, Issue};
use std::collections::BTreeMap;

/// Reference data for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueEntry {
    /// Short human-readable title used by reports
    pub title: &'static str,
    pub wcag_reference: &'static str,
    pub fix_hint: &'static str,
}

/// Category-keyed reference table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogue {
    entries: BTreeMap<Category, CatalogueEntry>,
}

const NON_TEXT_CONTENT: &str = "WCAG 2.1 Level A - 1.1.1 Non-text Content";
const INFO_AND_RELATIONSHIPS: &str = "WCAG 2.1 Level A - 1.3.1 Info and Relationships";
const LINK_PURPOSE: &str = "WCAG 2.1 Level A - 2.4.4 Link Purpose (In Context)";

impl Catalogue {
    /// The built-in table
    pub fn standard() -> Self {
        let rows: [(Category, &'static str, &'static str, &'static str); 14] = [
            (
                Category::MissingAltText,
                "Image missing alt text",
                NON_TEXT_CONTENT,
                "Add descriptive alt text: ![description](image.png) or <img alt=\"description\">",
            ),
            (
                Category::EmptyAltText,
                "Image marked decorative",
                NON_TEXT_CONTENT,
                "Confirm the image is purely decorative; otherwise describe it in the alt attribute",
            ),
            (
                Category::ImageAltText,
                "Image has alt text",
                NON_TEXT_CONTENT,
                "No action needed",
            ),
            (
                Category::HeadingStructure,
                "Document does not start at heading level 1",
                INFO_AND_RELATIONSHIPS,
                "Make the first heading a level-1 heading (# Title)",
            ),
            (
                Category::HeadingHierarchySkip,
                "Heading level skipped",
                INFO_AND_RELATIONSHIPS,
                "Use sequential heading levels (H1, H2, H3...)",
            ),
            (
                Category::MissingTitle,
                "Notebook has no title",
                "WCAG 2.1 Level A - 2.4.2 Page Titled",
                "Add a # Main Title at the beginning of the notebook",
            ),
            (
                Category::MissingChartDescription,
                "Chart output without description",
                NON_TEXT_CONTENT,
                "Describe what the chart shows in a markdown cell directly before or after it",
            ),
            (
                Category::ColorDependence,
                "Information conveyed by color alone",
                "WCAG 2.1 Level A - 1.4.1 Use of Color",
                "Add labels, markers, hatching or line styles alongside color",
            ),
            (
                Category::TableNoHeader,
                "Table missing header row",
                INFO_AND_RELATIONSHIPS,
                "Add a header separator line with |---|---| format after the first row",
            ),
            (
                Category::HtmlTableNoHeader,
                "HTML table missing header cells",
                INFO_AND_RELATIONSHIPS,
                "Use <th scope=\"col\"> cells for the header row",
            ),
            (
                Category::BareUrl,
                "Bare URL",
                LINK_PURPOSE,
                "Wrap the URL in a link with a descriptive label: [Dataset documentation](https://...)",
            ),
            (
                Category::NonDescriptiveLink,
                "Non-descriptive link text",
                LINK_PURPOSE,
                "Use link text that describes the destination instead of phrases like \"click here\"",
            ),
            (
                Category::CodeContext,
                "Code cells without explanation",
                "WCAG 2.1 Level AAA - 3.1.5 Reading Level",
                "Add a markdown cell explaining what the code does",
            ),
            (
                Category::InternalRuleFailure,
                "Rule failed to run",
                "N/A",
                "Report this notebook to the notebookbot maintainers; the rule's checks were not applied",
            ),
        ];

        let entries = rows
            .into_iter()
            .map(|(category, title, wcag_reference, fix_hint)| {
                (
                    category,
                    CatalogueEntry {
                        title,
                        wcag_reference,
                        fix_hint,
                    },
                )
            })
            .collect();

        Self { entries }
    }

    /// Replace the entry for one category
    pub fn with_entry(mut self, category: Category, entry: CatalogueEntry) -> Self {
        self.entries.insert(category, entry);
        self
    }

    /// Reference data for a category.
    ///
    /// Categories absent from a custom table fall back to their code as
    /// title and an empty reference.
    pub fn entry(&self, category: Category) -> CatalogueEntry {
        self.entries
            .get(&category)
            .copied()
            .unwrap_or(CatalogueEntry {
                title: category.code(),
                wcag_reference: "",
                fix_hint: "",
            })
    }

    /// Build an issue with the category's fixed severity and this table's
    /// references
    pub fn issue(
        &self,
        category: Category,
        cell_index: Option<usize>,
        rule: &str,
        message: &str,
    ) -> Issue {
        let entry = self.entry(category);
        Issue {
            category,
            severity: category.severity(),
            cell_index,
            message: message.to_string(),
            wcag_reference: entry.wcag_reference.to_string(),
            fix_hint: entry.fix_hint.to_string(),
            rule: rule.to_string(),
            element: None,
        }
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Severity;

    #[test]
    fn test_standard_covers_every_category() {
        let catalogue = Catalogue::standard();
        for category in Category::ALL {
            let entry = catalogue.entry(category);
            assert!(!entry.wcag_reference.is_empty(), "{category} has no WCAG reference");
        }
    }

    #[test]
    fn test_issue_is_stamped_from_table() {
        let catalogue = Catalogue::standard();
        let issue = catalogue.issue(Category::MissingTitle, Some(0), "Missing Title", "no title");
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.wcag_reference, "WCAG 2.1 Level A - 2.4.2 Page Titled");
        assert_eq!(issue.rule, "Missing Title");
    }

    #[test]
    fn test_alternate_table_substitutes_references() {
        let catalogue = Catalogue::standard().with_entry(
            Category::BareUrl,
            CatalogueEntry {
                title: "Raw link",
                wcag_reference: "WCAG 2.2 Level AAA - 2.4.9 Link Purpose (Link Only)",
                fix_hint: "label it",
            },
        );
        let issue = catalogue.issue(Category::BareUrl, Some(3), "Link Quality", "bare");
        assert_eq!(issue.wcag_reference, "WCAG 2.2 Level AAA - 2.4.9 Link Purpose (Link Only)");
        assert_eq!(issue.fix_hint, "label it");
    }
}
