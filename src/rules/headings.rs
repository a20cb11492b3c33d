// SPDX-License-Identifier: PMPL-1.0-or-later
//! Heading rules - WCAG 1.3.1 Info and Relationships, 2.4.2 Page Titled
//!
//! Headings are collected across all markdown cells in cell order, so the
//! hierarchy is checked for the notebook as a whole:
//! - The first heading must be level 1
//! - A heading may be at most one level deeper than the one before it
//! - A level-1 heading must come before any level-2 heading

use crate::issue::{Category, Issue};
use crate::markdown;
use crate::notebook::Notebook;
use crate::rules::{Rule, RuleContext, RuleError};

/// A heading together with the cell it was found in
struct LocatedHeading {
    cell_index: usize,
    level: usize,
    text: String,
}

fn notebook_headings(notebook: &Notebook) -> Vec<LocatedHeading> {
    notebook
        .markdown_cells()
        .flat_map(|cell| {
            markdown::headings(&cell.source)
                .into_iter()
                .map(move |h| LocatedHeading {
                    cell_index: cell.index(),
                    level: h.level,
                    text: h.text,
                })
        })
        .collect()
}

/// Rule for heading order across the notebook
pub struct HeadingStructureRule;

impl Rule for HeadingStructureRule {
    fn name(&self) -> &str {
        "Heading Structure"
    }

    fn description(&self) -> &str {
        "Checks that headings start at level 1 and never skip a level (WCAG 1.3.1)"
    }

    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
        let headings = notebook_headings(notebook);
        let mut issues = Vec::new();

        let Some(first) = headings.first() else {
            return Ok(issues);
        };

        if first.level != 1 {
            issues.push(
                ctx.catalogue
                    .issue(
                        Category::HeadingStructure,
                        Some(first.cell_index),
                        self.name(),
                        &format!(
                            "First heading is level {} instead of level 1: \"{}\"",
                            first.level, first.text
                        ),
                    )
                    .with_element(&format!("{} {}", "#".repeat(first.level), first.text)),
            );
        }

        for pair in headings.windows(2) {
            let (prev, current) = (&pair[0], &pair[1]);
            if current.level > prev.level + 1 {
                issues.push(
                    ctx.catalogue
                        .issue(
                            Category::HeadingHierarchySkip,
                            Some(current.cell_index),
                            self.name(),
                            &format!(
                                "Heading level skipped (jumped from H{} to H{}): \"{}\"",
                                prev.level, current.level, current.text
                            ),
                        )
                        .with_element(&format!("{} {}", "#".repeat(current.level), current.text)),
                );
            }
        }

        Ok(issues)
    }
}

/// Rule for a main title
pub struct MissingTitleRule;

impl Rule for MissingTitleRule {
    fn name(&self) -> &str {
        "Missing Title"
    }

    fn description(&self) -> &str {
        "Checks for a level-1 title heading before any level-2 heading (WCAG 2.4.2)"
    }

    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
        let message = match title_status(notebook) {
            TitleStatus::Present => return Ok(Vec::new()),
            TitleStatus::Late => "Notebook title (H1 heading) appears only after a level-2 heading",
            TitleStatus::Absent => "Notebook is missing a main title (H1 heading)",
        };

        Ok(vec![ctx.catalogue.issue(
            Category::MissingTitle,
            Some(0),
            self.name(),
            message,
        )])
    }
}

/// Where a notebook's level-1 title stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStatus {
    /// A level-1 heading comes before every level-2 heading
    Present,
    /// Level-1 headings exist, but only after a level-2 heading
    Late,
    /// No level-1 heading anywhere
    Absent,
}

pub fn title_status(notebook: &Notebook) -> TitleStatus {
    let headings = notebook_headings(notebook);

    let first_h1 = headings.iter().position(|h| h.level == 1);
    let first_h2 = headings.iter().position(|h| h.level == 2);

    match (first_h1, first_h2) {
        (None, _) => TitleStatus::Absent,
        (Some(h1), Some(h2)) if h2 < h1 => TitleStatus::Late,
        (Some(_), _) => TitleStatus::Present,
    }
}
