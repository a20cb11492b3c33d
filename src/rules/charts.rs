// SPDX-License-Identifier: PMPL-1.0-or-later
//! Chart description rule - WCAG 1.1.1 Non-text Content (Level A)
//!
//! A code cell whose outputs include an image needs a markdown neighbour
//! (the cell directly before or after it) with more than a trivial amount
//! of text describing what the chart shows.

use crate::issue::{Category, Issue};
use crate::markdown;
use crate::notebook::{Cell, Notebook};
use crate::rules::{Rule, RuleContext, RuleError};

/// Rule for textual descriptions of rendered charts
pub struct ChartDescriptionRule;

impl ChartDescriptionRule {
    fn describes(cell: Option<&Cell>, min_chars: usize) -> bool {
        cell.filter(|c| c.is_markdown())
            .map(|c| markdown::strip_markup(&c.source).chars().count() > min_chars)
            .unwrap_or(false)
    }
}

impl Rule for ChartDescriptionRule {
    fn name(&self) -> &str {
        "Chart Description"
    }

    fn description(&self) -> &str {
        "Checks that image outputs have a describing markdown cell next to them (WCAG 1.1.1)"
    }

    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
        let min_chars = ctx.settings.min_description_chars;
        let mut issues = Vec::new();

        for cell in notebook.code_cells().filter(|c| c.has_image_output()) {
            let index = cell.index();
            let previous = index.checked_sub(1).and_then(|i| notebook.cell(i));
            let next = notebook.cell(index + 1);

            if Self::describes(previous, min_chars) || Self::describes(next, min_chars) {
                continue;
            }

            let images = cell.outputs().iter().filter(|o| o.is_image()).count();
            issues.push(
                ctx.catalogue
                    .issue(
                        Category::MissingChartDescription,
                        Some(index),
                        self.name(),
                        &format!(
                            "Code cell renders {} image output(s) without a nearby textual description",
                            images
                        ),
                    )
                    .with_element(&markdown::excerpt(&cell.source, 80)),
            );
        }

        Ok(issues)
    }
}
