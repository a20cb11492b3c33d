// SPDX-License-Identifier: PMPL-1.0-or-later
//! Link quality rule - WCAG 2.4.4 Link Purpose (In Context) (Level A)
//!
//! Flags URLs pasted as plain text and markdown links whose label is a
//! low-information phrase such as "click here".

use crate::issue::{Category, Issue};
use crate::markdown;
use crate::notebook::Notebook;
use crate::rules::{Rule, RuleContext, RuleError};

/// Rule for link purpose
pub struct LinkQualityRule;

impl LinkQualityRule {
    fn is_non_descriptive(label: &str, phrases: &[String]) -> bool {
        let normalized = label
            .trim()
            .trim_end_matches(['.', ',', ':', ';', '!', '?'])
            .trim()
            .to_lowercase();
        phrases
            .iter()
            .any(|phrase| phrase.trim().to_lowercase() == normalized)
    }
}

impl Rule for LinkQualityRule {
    fn name(&self) -> &str {
        "Link Quality"
    }

    fn description(&self) -> &str {
        "Checks for bare URLs and non-descriptive link text (WCAG 2.4.4)"
    }

    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
        let phrases = &ctx.settings.non_descriptive_phrases;
        let mut issues = Vec::new();

        for cell in notebook.markdown_cells() {
            let source = &cell.source;

            // both kinds in the order they appear in the cell
            let mut found: Vec<(usize, Issue)> = Vec::new();

            for span in markdown::bare_urls(source) {
                let url = &source[span.clone()];
                found.push((
                    span.start,
                    ctx.catalogue
                        .issue(
                            Category::BareUrl,
                            Some(cell.index()),
                            self.name(),
                            &format!("Bare URL without descriptive link text: {}", url),
                        )
                        .with_element(url)
                        .with_fix_hint(&format!("Replace with [descriptive text]({})", url)),
                ));
            }

            for link in markdown::links(source) {
                if !Self::is_non_descriptive(&link.label, phrases) {
                    continue;
                }
                found.push((
                    link.span.start,
                    ctx.catalogue
                        .issue(
                            Category::NonDescriptiveLink,
                            Some(cell.index()),
                            self.name(),
                            &format!(
                                "Link text \"{}\" does not describe its destination",
                                link.label.trim()
                            ),
                        )
                        .with_element(&source[link.span.clone()]),
                ));
            }

            found.sort_by_key(|(offset, _)| *offset);
            issues.extend(found.into_iter().map(|(_, issue)| issue));
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Catalogue;
    use crate::config::RuleSettings;
    use crate::notebook::Cell;

    fn run(cells: Vec<Cell>) -> Vec<Issue> {
        let catalogue = Catalogue::standard();
        let settings = RuleSettings::default();
        LinkQualityRule
            .check(&Notebook::new(cells), &RuleContext::new(&catalogue, &settings))
            .expect("rule should not fail")
    }

    #[test]
    fn test_bare_url() {
        let issues = run(vec![Cell::markdown("Source: https://data.example.org/usage.csv")]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, Category::BareUrl);
        assert_eq!(issues[0].element.as_deref(), Some("https://data.example.org/usage.csv"));
        assert_eq!(
            issues[0].fix_hint,
            "Replace with [descriptive text](https://data.example.org/usage.csv)"
        );
    }

    #[test]
    fn test_non_descriptive_labels() {
        let issues = run(vec![Cell::markdown(
            "Click [here](https://a.example). [Click Here!](b.html) [the usage dashboard](c.html)",
        )]);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.category == Category::NonDescriptiveLink));
    }

    #[test]
    fn test_issues_in_source_order() {
        let issues = run(vec![Cell::markdown("[this link](x.html) then https://b.example")]);
        let categories: Vec<Category> = issues.iter().map(|i| i.category).collect();
        assert_eq!(categories, vec![Category::NonDescriptiveLink, Category::BareUrl]);
    }

    #[test]
    fn test_url_in_html_attribute_is_not_bare() {
        let issues = run(vec![Cell::markdown(
            "<img src=\"https://example.org/chart.png\" alt=\"Chart of usage\">",
        )]);
        assert!(issues.is_empty(), "got {:?}", issues);
    }

    #[test]
    fn test_custom_phrases() {
        let catalogue = Catalogue::standard();
        let settings = RuleSettings {
            non_descriptive_phrases: vec!["hier".to_string()],
            ..RuleSettings::default()
        };
        let notebook = Notebook::new(vec![Cell::markdown("[Hier](x.html) [here](y.html)")]);
        let issues = LinkQualityRule
            .check(&notebook, &RuleContext::new(&catalogue, &settings))
            .expect("rule should not fail");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("Hier"));
    }
}
