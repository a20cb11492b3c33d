// SPDX-License-Identifier: PMPL-1.0-or-later
//! Table header rule - WCAG 1.3.1 Info and Relationships (Level A)
//!
//! Pipe tables need a header separator as their second row; HTML tables
//! need at least one `<th>` cell.

use crate::issue::{Category, Issue};
use crate::markdown;
use crate::notebook::Notebook;
use crate::rules::{Rule, RuleContext, RuleError};

/// Rule for table header rows
pub struct TableHeaderRule;

impl Rule for TableHeaderRule {
    fn name(&self) -> &str {
        "Table Header"
    }

    fn description(&self) -> &str {
        "Checks markdown and HTML tables for header rows (WCAG 1.3.1)"
    }

    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
        let mut issues = Vec::new();

        for cell in notebook.markdown_cells() {
            for table in markdown::pipe_tables(&cell.source) {
                if table.has_header() {
                    continue;
                }
                issues.push(
                    ctx.catalogue
                        .issue(
                            Category::TableNoHeader,
                            Some(cell.index()),
                            self.name(),
                            &format!(
                                "Table with {} row(s) has no header separator after its first row",
                                table.rows.len()
                            ),
                        )
                        .with_element(&table.rows[0]),
                );
            }

            for table in markdown::html_tables(&cell.source) {
                if table.to_lowercase().contains("<th") {
                    continue;
                }
                issues.push(
                    ctx.catalogue
                        .issue(
                            Category::HtmlTableNoHeader,
                            Some(cell.index()),
                            self.name(),
                            "HTML table is missing header cells (th)",
                        )
                        .with_element(&markdown::excerpt(table, 80)),
                );
            }
        }

        Ok(issues)
    }
}
