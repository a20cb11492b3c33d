// SPDX-License-Identifier: PMPL-1.0-or-later
//! Code context rule - WCAG 3.1.5 Reading Level (Level AAA)
//!
//! Two or more code cells in a row with no markdown between them leave
//! readers without an explanation. One warning is raised per run, on the
//! run's second cell.

use crate::issue::{Category, Issue};
use crate::notebook::Notebook;
use crate::rules::{Rule, RuleContext, RuleError};

/// Rule for unexplained runs of code cells
pub struct CodeContextRule;

impl Rule for CodeContextRule {
    fn name(&self) -> &str {
        "Code Context"
    }

    fn description(&self) -> &str {
        "Checks that consecutive code cells are explained by markdown (WCAG 3.1.5)"
    }

    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
        let mut issues = Vec::new();
        let mut run_len = 0usize;

        for cell in notebook.cells() {
            if !cell.is_code() {
                run_len = 0;
                continue;
            }

            run_len += 1;
            if run_len == 2 {
                issues.push(ctx.catalogue.issue(
                    Category::CodeContext,
                    Some(cell.index()),
                    self.name(),
                    &format!(
                        "Code cells {} and {} follow each other without a markdown explanation",
                        cell.index(),
                        cell.index() + 1
                    ),
                ));
            }
        }

        Ok(issues)
    }
}
