// SPDX-License-Identifier: PMPL-1.0-or-later
//! Issue aggregation and the audit entry point.
//!
//! [`AuditReport`] is a pure fold over the per-rule issue lists: discovery
//! order is kept, nothing is deduplicated, and the tier counts always add up
//! to the number of issues.

use crate::catalogue::Catalogue;
use crate::config::RuleSettings;
use crate::issue::{Category, Issue, Severity};
use crate::notebook::Notebook;
use crate::rules::{RuleContext, RuleRegistry};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Issue counts per severity tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub warning: usize,
    pub success: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Success => self.success,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.success
    }

    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Success => self.success += 1,
        }
    }
}

/// Aggregated result of one audit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    issues: Vec<Issue>,
    counts: SeverityCounts,
}

impl AuditReport {
    /// Fold issues, in the order given, into a report
    pub fn from_issues(issues: impl IntoIterator<Item = Issue>) -> Self {
        let mut report = Self::default();
        for issue in issues {
            report.counts.record(issue.severity);
            report.issues.push(issue);
        }
        report
    }

    /// Concatenate per-rule results in registry order
    pub fn from_rule_results(results: Vec<Vec<Issue>>) -> Self {
        Self::from_issues(results.into_iter().flatten())
    }

    /// All issues in discovery order
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues of one tier, in discovery order
    pub fn by_severity(&self, severity: Severity) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.severity == severity).collect()
    }

    /// Issues of one category, in discovery order
    pub fn by_category(&self, category: Category) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.category == category).collect()
    }

    /// Issues grouped Critical, Warning, Success; discovery order within a tier
    pub fn in_tier_order(&self) -> Vec<&Issue> {
        Severity::ALL
            .iter()
            .flat_map(|severity| self.by_severity(*severity))
            .collect()
    }

    /// Whether any issue blocks conformance
    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity.blocks_conformance())
    }
}

/// Runs the rule registry over notebooks.
///
/// Holds no mutable state; one auditor can serve any number of notebooks,
/// from any number of threads.
pub struct Auditor {
    registry: RuleRegistry,
    catalogue: Catalogue,
    settings: RuleSettings,
}

impl Auditor {
    pub fn new(registry: RuleRegistry, catalogue: Catalogue, settings: RuleSettings) -> Self {
        Self {
            registry,
            catalogue,
            settings,
        }
    }

    /// Standard rules and catalogue with the given settings
    pub fn with_settings(settings: RuleSettings) -> Self {
        Self::new(RuleRegistry::standard(), Catalogue::standard(), settings)
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Audit a notebook; the notebook is only read
    pub fn audit(&self, notebook: &Notebook) -> AuditReport {
        let ctx = RuleContext::new(&self.catalogue, &self.settings);
        let report = AuditReport::from_rule_results(self.registry.run(notebook, &ctx));

        let counts = report.counts();
        info!(
            "Audited {} cells: {} critical, {} warning(s), {} success",
            notebook.len(),
            counts.critical,
            counts.warning,
            counts.success
        );
        report
    }
}

impl Default for Auditor {
    fn default() -> Self {
        Self::with_settings(RuleSettings::default())
    }
}
