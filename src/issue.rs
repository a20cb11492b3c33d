// SPDX-License-Identifier: PMPL-1.0-or-later
//! Issue model shared by the rule engine, aggregator, reporter and remediator.

use serde::{Deserialize, Serialize};

/// Severity tier of an issue.
///
/// Ordering follows report order: Critical first, Success last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must fix, blocks conformance
    Critical,
    /// Should fix
    Warning,
    /// Confirmed compliant
    Success,
}

impl Severity {
    /// All tiers in report order
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Warning, Severity::Success];

    /// Whether this severity blocks conformance
    pub fn blocks_conformance(&self) -> bool {
        matches!(self, Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Success => write!(f, "SUCCESS"),
        }
    }
}

/// Closed set of issue categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    MissingAltText,
    EmptyAltText,
    ImageAltText,
    HeadingStructure,
    HeadingHierarchySkip,
    MissingTitle,
    MissingChartDescription,
    ColorDependence,
    TableNoHeader,
    HtmlTableNoHeader,
    BareUrl,
    NonDescriptiveLink,
    CodeContext,
    InternalRuleFailure,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::MissingAltText,
        Category::EmptyAltText,
        Category::ImageAltText,
        Category::HeadingStructure,
        Category::HeadingHierarchySkip,
        Category::MissingTitle,
        Category::MissingChartDescription,
        Category::ColorDependence,
        Category::TableNoHeader,
        Category::HtmlTableNoHeader,
        Category::BareUrl,
        Category::NonDescriptiveLink,
        Category::CodeContext,
        Category::InternalRuleFailure,
    ];

    /// The tier every issue of this category carries
    pub const fn severity(&self) -> Severity {
        match self {
            Category::MissingAltText => Severity::Critical,
            Category::ImageAltText => Severity::Success,
            Category::EmptyAltText
            | Category::HeadingStructure
            | Category::HeadingHierarchySkip
            | Category::MissingTitle
            | Category::MissingChartDescription
            | Category::ColorDependence
            | Category::TableNoHeader
            | Category::HtmlTableNoHeader
            | Category::BareUrl
            | Category::NonDescriptiveLink
            | Category::CodeContext
            | Category::InternalRuleFailure => Severity::Warning,
        }
    }

    /// Wire name, e.g. `MISSING_ALT_TEXT`
    pub fn code(&self) -> &'static str {
        match self {
            Category::MissingAltText => "MISSING_ALT_TEXT",
            Category::EmptyAltText => "EMPTY_ALT_TEXT",
            Category::ImageAltText => "IMAGE_ALT_TEXT",
            Category::HeadingStructure => "HEADING_STRUCTURE",
            Category::HeadingHierarchySkip => "HEADING_HIERARCHY_SKIP",
            Category::MissingTitle => "MISSING_TITLE",
            Category::MissingChartDescription => "MISSING_CHART_DESCRIPTION",
            Category::ColorDependence => "COLOR_DEPENDENCE",
            Category::TableNoHeader => "TABLE_NO_HEADER",
            Category::HtmlTableNoHeader => "HTML_TABLE_NO_HEADER",
            Category::BareUrl => "BARE_URL",
            Category::NonDescriptiveLink => "NON_DESCRIPTIVE_LINK",
            Category::CodeContext => "CODE_CONTEXT",
            Category::InternalRuleFailure => "INTERNAL_RULE_FAILURE",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A single detection (or confirmation) produced by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Category from the closed enumeration
    pub category: Category,
    /// Tier, fixed by the catalogue for this category
    pub severity: Severity,
    /// Cell the issue was found in; `None` for document-level diagnostics
    pub cell_index: Option<usize>,
    /// Human-readable description
    pub message: String,
    /// WCAG success criterion reference
    pub wcag_reference: String,
    /// How to resolve the issue
    pub fix_hint: String,
    /// Name of the rule that produced this issue
    pub rule: String,
    /// Source excerpt the issue points at
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub element: Option<String>,
}

impl Issue {
    /// Attach the offending source excerpt
    pub fn with_element(mut self, element: &str) -> Self {
        self.element = Some(element.to_string());
        self
    }

    /// Override the fix hint for this occurrence
    pub fn with_fix_hint(mut self, hint: &str) -> Self {
        self.fix_hint = hint.to_string();
        self
    }

    /// Location string for display
    pub fn location_string(&self) -> String {
        match self.cell_index {
            Some(index) => format!("Cell {}", index + 1),
            None => "Notebook".to_string(),
        }
    }
}
