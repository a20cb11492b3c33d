// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessibility rules implementing WCAG 2.1 checks for notebooks.
//!
//! Each rule is a pure, stateless check from a [`Notebook`] to a list of
//! [`Issue`]s. Rules live in an ordered, immutable [`RuleRegistry`] and are
//! all evaluated, in registry order, on every audit. A rule that fails,
//! whether by returning an error or by panicking, is reported as a single
//! `INTERNAL_RULE_FAILURE` warning and the remaining rules still run.

pub mod alt_text;
pub mod charts;
pub mod code_context;
pub mod color;
pub mod headings;
pub mod links;
pub mod tables;

use crate::catalogue::Catalogue;
use crate::config::RuleSettings;
use crate::issue::{Category, Issue};
use crate::markdown::MarkupError;
use crate::notebook::Notebook;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, warn};

/// Internal failure of a single rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RuleError(pub String);

impl From<MarkupError> for RuleError {
    fn from(err: MarkupError) -> Self {
        RuleError(err.to_string())
    }
}

/// Everything a rule may read besides the notebook itself
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub catalogue: &'a Catalogue,
    pub settings: &'a RuleSettings,
}

impl<'a> RuleContext<'a> {
    pub fn new(catalogue: &'a Catalogue, settings: &'a RuleSettings) -> Self {
        Self { catalogue, settings }
    }
}

/// Trait implemented by all rules
pub trait Rule: Send + Sync {
    /// Human-readable name of this rule
    fn name(&self) -> &str;

    /// Short description of what this rule checks
    fn description(&self) -> &str;

    /// Check a notebook; issues are returned in ascending cell order
    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError>;
}

/// Ordered, immutable set of rules
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    /// The built-in rules in evaluation order
    pub fn standard() -> Self {
        Self::from_rules(vec![
            Box::new(headings::HeadingStructureRule),
            Box::new(headings::MissingTitleRule),
            Box::new(alt_text::AltTextRule),
            Box::new(charts::ChartDescriptionRule),
            Box::new(color::ColorDependenceRule),
            Box::new(tables::TableHeaderRule),
            Box::new(links::LinkQualityRule),
            Box::new(code_context::CodeContextRule),
        ])
    }

    /// A registry with a caller-chosen rule list
    pub fn from_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule in order, returning one issue list per rule
    pub fn run(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Vec<Vec<Issue>> {
        self.rules
            .iter()
            .map(|rule| run_rule(rule.as_ref(), notebook, ctx))
            .collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Evaluate one rule, converting any failure into an issue
fn run_rule(rule: &dyn Rule, notebook: &Notebook, ctx: &RuleContext<'_>) -> Vec<Issue> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.check(notebook, ctx)));

    let reason = match outcome {
        Ok(Ok(issues)) => {
            debug!("{}: {} issue(s)", rule.name(), issues.len());
            return issues;
        }
        Ok(Err(err)) => err.to_string(),
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic".to_string()),
    };

    warn!("Rule '{}' failed: {}", rule.name(), reason);
    vec![ctx.catalogue.issue(
        Category::InternalRuleFailure,
        None,
        rule.name(),
        &format!("Rule '{}' failed and was skipped: {}", rule.name(), reason),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Severity;
    use crate::notebook::Cell;

    struct FailingRule;

    impl Rule for FailingRule {
        fn name(&self) -> &str {
            "Failing"
        }

        fn description(&self) -> &str {
            "always errors"
        }

        fn check(&self, _: &Notebook, _: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
            Err(RuleError("unexpected input".to_string()))
        }
    }

    struct PanickingRule;

    impl Rule for PanickingRule {
        fn name(&self) -> &str {
            "Panicking"
        }

        fn description(&self) -> &str {
            "always panics"
        }

        fn check(&self, _: &Notebook, _: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
            panic!("index out of range");
        }
    }

    #[test]
    fn test_standard_registry_order() {
        let registry = RuleRegistry::standard();
        let names: Vec<&str> = registry.rules().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "Heading Structure",
                "Missing Title",
                "Alt Text",
                "Chart Description",
                "Color Dependence",
                "Table Header",
                "Link Quality",
                "Code Context",
            ]
        );
    }

    #[test]
    fn test_failing_rules_do_not_abort_the_run() {
        let registry = RuleRegistry::from_rules(vec![
            Box::new(FailingRule),
            Box::new(PanickingRule),
            Box::new(code_context::CodeContextRule),
        ]);
        let notebook = Notebook::new(vec![Cell::code("a = 1"), Cell::code("b = 2")]);
        let catalogue = Catalogue::standard();
        let settings = RuleSettings::default();

        let results = registry.run(&notebook, &RuleContext::new(&catalogue, &settings));

        assert_eq!(results.len(), 3);
        for (failed, name) in results[..2].iter().zip(["Failing", "Panicking"]) {
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].category, Category::InternalRuleFailure);
            assert_eq!(failed[0].severity, Severity::Warning);
            assert!(failed[0].message.contains(name), "{}", failed[0].message);
        }
        assert!(results[1][0].message.contains("index out of range"));
        assert_eq!(results[2].len(), 1);
        assert_eq!(results[2][0].category, Category::CodeContext);
    }
}
