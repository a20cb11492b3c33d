// SPDX-License-Identifier: PMPL-1.0-or-later
//! Deterministic fixes for the mechanically repairable issue categories.
//!
//! The [`Remediator`] works on a clone of the caller's notebook and applies
//! three passes in a fixed order:
//!
//! 1. Missing title: insert a `# <placeholder>` markdown cell at index 0
//! 2. Missing alt text: fill in a placeholder, in the image's own syntax
//! 3. Bare URLs: wrap as `[url](url)`
//!
//! The title pass runs first because it shifts every cell index; all later
//! passes scan the already-shifted notebook, so change records carry
//! post-insertion indices. Each pass only touches what the matching rule
//! would flag, which makes a second run a no-op. Each planned edit is tried
//! on a copy of the cell and re-parsed first; one that cannot be anchored or
//! does not parse back as intended is skipped and recorded, and the rest
//! still apply.

use crate::config::RemediationSettings;
use crate::issue::Category;
use crate::markdown::{self, AltText, ImageRef, ImageSyntax};
use crate::notebook::{Cell, Notebook};
use crate::rules::headings::{title_status, TitleStatus};
use serde::Serialize;
use std::ops::Range;
use tracing::{debug, info, warn};

/// One applied edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    /// Cell the edit landed in, counted after any title insertion
    pub cell_index: usize,
    pub category: Category,
    pub before: String,
    pub after: String,
}

/// An edit that was not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFix {
    pub cell_index: Option<usize>,
    pub category: Category,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Result of one remediation run
#[derive(Debug, Clone, PartialEq)]
pub struct Remediation {
    /// The repaired copy
    pub notebook: Notebook,
    /// Applied edits in application order
    pub changes: Vec<ChangeRecord>,
    /// Edits that could not be applied
    pub skipped: Vec<SkippedFix>,
}

impl Remediation {
    /// Whether nothing was changed
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }

    /// Applied changes of one category
    pub fn changes_for(&self, category: Category) -> Vec<&ChangeRecord> {
        self.changes.iter().filter(|c| c.category == category).collect()
    }
}

/// A replacement of one byte range within a cell source
#[derive(Debug)]
struct Edit {
    span: Range<usize>,
    replacement: String,
}

/// Applies the automatic fixes
#[derive(Debug, Clone, Default)]
pub struct Remediator {
    settings: RemediationSettings,
}

impl Remediator {
    pub fn new(settings: RemediationSettings) -> Self {
        Self { settings }
    }

    /// Repair a copy of `notebook`; the original is left untouched
    pub fn remediate(&self, notebook: &Notebook) -> Remediation {
        let mut remediation = Remediation {
            notebook: notebook.clone(),
            changes: Vec::new(),
            skipped: Vec::new(),
        };

        self.fix_title(&mut remediation);
        self.fix_alt_text(&mut remediation);
        self.fix_bare_urls(&mut remediation);

        for skip in &remediation.skipped {
            warn!(
                "Skipped {} fix{}: {}",
                skip.category,
                skip.cell_index
                    .map(|i| format!(" in cell {}", i))
                    .unwrap_or_default(),
                skip.reason
            );
        }
        info!(
            "Remediation applied {} change(s), skipped {}",
            remediation.changes.len(),
            remediation.skipped.len()
        );

        remediation
    }

    fn fix_title(&self, remediation: &mut Remediation) {
        match title_status(&remediation.notebook) {
            TitleStatus::Present => {}
            TitleStatus::Late => remediation.skipped.push(SkippedFix {
                cell_index: Some(0),
                category: Category::MissingTitle,
                reason: "a level-1 heading exists after a level-2 heading; move it to the top by hand"
                    .to_string(),
                snippet: None,
            }),
            TitleStatus::Absent => {
                let heading = format!("# {}", self.settings.title_placeholder.trim());
                remediation
                    .notebook
                    .insert_cell_at(0, Cell::markdown(&heading));
                debug!("Inserted title cell: {}", heading);
                remediation.changes.push(ChangeRecord {
                    cell_index: 0,
                    category: Category::MissingTitle,
                    before: String::new(),
                    after: heading,
                });
            }
        }
    }

    fn fix_alt_text(&self, remediation: &mut Remediation) {
        let placeholder = self.settings.alt_text_placeholder.trim();

        for index in markdown_indices(&remediation.notebook) {
            let Some(source) = remediation.notebook.cell(index).map(|c| c.source.clone()) else {
                continue;
            };

            let images = match markdown::image_refs(&source) {
                Ok(images) => images,
                Err(e) => {
                    remediation.skipped.push(SkippedFix {
                        cell_index: Some(index),
                        category: Category::MissingAltText,
                        reason: e.to_string(),
                        snippet: None,
                    });
                    continue;
                }
            };

            let mut edits = Vec::new();
            for image in images.iter().filter(|img| img.alt.needs_text()) {
                let planned = alt_text_edit(image, &source, placeholder)
                    .and_then(|edit| verify_alt_edit(image, &source, edit, placeholder));
                match planned {
                    Ok(edit) => edits.push(edit),
                    Err(reason) => remediation.skipped.push(SkippedFix {
                        cell_index: Some(index),
                        category: Category::MissingAltText,
                        reason,
                        snippet: Some(image.text(&source).to_string()),
                    }),
                }
            }

            self.apply_edits(remediation, index, &source, edits, Category::MissingAltText);
        }
    }

    fn fix_bare_urls(&self, remediation: &mut Remediation) {
        for index in markdown_indices(&remediation.notebook) {
            let Some(source) = remediation.notebook.cell(index).map(|c| c.source.clone()) else {
                continue;
            };

            let mut edits = Vec::new();
            for span in markdown::bare_urls(&source) {
                let url = &source[span.clone()];
                let edit = Edit {
                    replacement: format!("[{}]({})", url, url),
                    span,
                };
                match verify_link_edit(&source, edit, url) {
                    Ok(edit) => edits.push(edit),
                    Err(reason) => remediation.skipped.push(SkippedFix {
                        cell_index: Some(index),
                        category: Category::BareUrl,
                        reason,
                        snippet: Some(url.to_string()),
                    }),
                }
            }

            self.apply_edits(remediation, index, &source, edits, Category::BareUrl);
        }
    }

    /// Apply non-overlapping edits to one cell, back to front so earlier
    /// offsets stay valid
    fn apply_edits(
        &self,
        remediation: &mut Remediation,
        index: usize,
        source: &str,
        mut edits: Vec<Edit>,
        category: Category,
    ) {
        if edits.is_empty() {
            return;
        }

        edits.sort_by_key(|e| e.span.start);
        let mut accepted: Vec<Edit> = Vec::with_capacity(edits.len());
        for edit in edits {
            let overlaps = accepted
                .last()
                .is_some_and(|prev| edit.span.start < prev.span.end);
            if overlaps {
                remediation.skipped.push(SkippedFix {
                    cell_index: Some(index),
                    category,
                    reason: "overlaps another edit in the same cell".to_string(),
                    snippet: Some(source[edit.span.clone()].to_string()),
                });
                continue;
            }
            accepted.push(edit);
        }

        let Some(cell) = remediation.notebook.cell_mut(index) else {
            return;
        };

        let mut records = Vec::with_capacity(accepted.len());
        for edit in accepted.into_iter().rev() {
            let before = source[edit.span.clone()].to_string();
            cell.source.replace_range(edit.span, &edit.replacement);
            debug!("Cell {}: {} -> {}", index, before, edit.replacement);
            records.push(ChangeRecord {
                cell_index: index,
                category,
                before,
                after: edit.replacement,
            });
        }

        // log in source order
        records.reverse();
        remediation.changes.extend(records);
    }
}

fn markdown_indices(notebook: &Notebook) -> Vec<usize> {
    notebook.markdown_cells().map(Cell::index).collect()
}

/// Build the rewrite for one image lacking alt text
fn alt_text_edit(image: &ImageRef, source: &str, placeholder: &str) -> Result<Edit, String> {
    let text = image.text(source);

    let replacement = match image.syntax {
        ImageSyntax::Markdown => {
            if placeholder.contains(['[', ']', '\n']) {
                return Err("placeholder cannot be used as markdown alt text".to_string());
            }
            let Some(label) = markdown::raw_label(text) else {
                return Err("could not locate the image label".to_string());
            };
            if !label.trim().is_empty() {
                return Err("image label holds markup but no text".to_string());
            }
            format!("![{}{}", placeholder, &text[2 + label.len()..])
        }
        ImageSyntax::Html => html_alt_rewrite(text, &image.alt, placeholder)?,
    };

    Ok(Edit {
        span: image.span.clone(),
        replacement,
    })
}

fn html_alt_rewrite(tag: &str, alt: &AltText, placeholder: &str) -> Result<String, String> {
    let attribute = format!(" alt=\"{}\"", escape_attribute(placeholder));
    let existing = markdown::alt_attributes(tag);

    match alt {
        AltText::Missing => {
            if !existing.is_empty() {
                return Err("tag text contains an alt attribute the parser did not accept".to_string());
            }
            let body_end = if tag.ends_with("/>") {
                tag.len() - 2
            } else {
                tag.len() - 1
            };
            let insert_at = tag[..body_end].trim_end().len();
            Ok(format!("{}{}{}", &tag[..insert_at], attribute, &tag[insert_at..]))
        }
        AltText::Blank => {
            let [span] = existing.as_slice() else {
                return Err(format!(
                    "expected exactly one alt attribute, found {}",
                    existing.len()
                ));
            };
            Ok(format!("{}{}{}", &tag[..span.start], attribute, &tag[span.end..]))
        }
        AltText::Empty | AltText::Present(_) => Err("image already has alt text".to_string()),
    }
}

/// Apply `edit` to a copy of the cell and return the source it would produce
fn trial_source(source: &str, edit: &Edit) -> String {
    let mut trial = source.to_string();
    trial.replace_range(edit.span.clone(), &edit.replacement);
    trial
}

/// Accept an alt text rewrite only if the edited cell parses back to the same
/// image, now carrying the placeholder, with every other attribute intact
fn verify_alt_edit(
    image: &ImageRef,
    source: &str,
    edit: Edit,
    placeholder: &str,
) -> Result<Edit, String> {
    let trial = trial_source(source, &edit);
    let expected = edit.span.start..edit.span.start + edit.replacement.len();
    let reparsed = markdown::image_refs(&trial).map_err(|e| e.to_string())?;

    let intact = reparsed.iter().any(|img| {
        img.span == expected
            && img.syntax == image.syntax
            && img.alt == AltText::Present(placeholder.to_string())
    });
    if !intact {
        return Err("rewritten image does not parse back with the new alt text".to_string());
    }

    if image.syntax == ImageSyntax::Html {
        let without_alt = |tag: &str| {
            markdown::img_attributes(tag).map(|mut attributes| {
                attributes.retain(|(name, _)| name != "alt");
                attributes
            })
        };
        match (without_alt(image.text(source)), without_alt(&edit.replacement)) {
            (Some(before), Some(after)) if before == after => {}
            _ => return Err("rewriting the tag would change its other attributes".to_string()),
        }
    }

    Ok(edit)
}

/// Accept a URL wrap only if the edited cell parses back to a link whose
/// target is the URL itself
fn verify_link_edit(source: &str, edit: Edit, url: &str) -> Result<Edit, String> {
    let trial = trial_source(source, &edit);
    let expected = edit.span.start..edit.span.start + edit.replacement.len();

    if markdown::links(&trial)
        .iter()
        .any(|link| link.span == expected && link.target == url)
    {
        Ok(edit)
    } else {
        Err("wrapped URL does not parse back as a link to itself".to_string())
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remediate(cells: Vec<Cell>) -> Remediation {
        Remediator::default().remediate(&Notebook::new(cells))
    }

    fn source(remediation: &Remediation, index: usize) -> &str {
        &remediation.notebook.cells()[index].source
    }

    #[test]
    fn test_title_inserted_and_indices_shift() {
        let result = remediate(vec![
            Cell::markdown("## Setup"),
            Cell::markdown("See https://example.org"),
        ]);

        assert_eq!(source(&result, 0), "# Untitled Notebook");
        assert_eq!(result.notebook.len(), 3);

        let url = result.changes_for(Category::BareUrl);
        assert_eq!(url.len(), 1);
        assert_eq!(url[0].cell_index, 2, "index should account for the new title cell");
        assert_eq!(source(&result, 2), "See [https://example.org](https://example.org)");
    }

    #[test]
    fn test_late_title_is_skipped_not_duplicated() {
        let result = remediate(vec![Cell::markdown("## Intro"), Cell::markdown("# Title")]);
        assert!(result.changes.is_empty());
        assert_eq!(result.notebook.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].category, Category::MissingTitle);
    }

    #[test]
    fn test_markdown_alt_text() {
        let result = remediate(vec![Cell::markdown("# T\n![](chart.png) and ![ ](b.png) and ![ok](c.png)")]);
        assert_eq!(
            source(&result, 0),
            "# T\n![Image description needed](chart.png) and ![Image description needed](b.png) and ![ok](c.png)"
        );
        let alt = result.changes_for(Category::MissingAltText);
        assert_eq!(alt.len(), 2);
        assert_eq!(alt[0].before, "![](chart.png)");
    }

    #[test]
    fn test_html_alt_text() {
        let result = remediate(vec![Cell::markdown(
            "# T\n<img src=\"a.png\">\n<img src=\"b.png\" />\n<img alt=\"  \" src=\"c.png\">",
        )]);
        assert_eq!(
            source(&result, 0),
            "# T\n<img src=\"a.png\" alt=\"Image description needed\">\n\
             <img src=\"b.png\" alt=\"Image description needed\" />\n\
             <img alt=\"Image description needed\" src=\"c.png\">"
        );
    }

    #[test]
    fn test_quoted_gt_in_html_attribute() {
        let result = remediate(vec![Cell::markdown("# T\n<img src=\"a.png\" title=\"x > y\">")]);
        assert_eq!(
            source(&result, 0),
            "# T\n<img src=\"a.png\" title=\"x > y\" alt=\"Image description needed\">"
        );
        assert!(result.skipped.is_empty());

        let second = Remediator::default().remediate(&result.notebook);
        assert!(second.changes.is_empty());
        assert!(second.skipped.is_empty());
    }

    #[test]
    fn test_rewrite_changing_other_attributes_is_skipped() {
        // the unquoted value runs into the `/`, so inserting before `/>` would alter src
        let cell = "# T\n<img src=a.png/>";
        let result = remediate(vec![Cell::markdown(cell)]);

        assert!(result.changes.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].category, Category::MissingAltText);
        assert_eq!(result.skipped[0].snippet.as_deref(), Some("<img src=a.png/>"));
        assert_eq!(source(&result, 0), cell);
    }

    #[test]
    fn test_code_block_examples_never_edited() {
        let cell = "# T\n````\n```\n![](x.png)\nhttps://example.org\n```\n````\n";
        let result = remediate(vec![Cell::markdown(cell)]);
        assert!(result.changes.is_empty(), "changed: {:?}", result.changes);
        assert_eq!(source(&result, 0), cell);
    }

    #[test]
    fn test_bracketed_alt_text_kept() {
        let cell = "# T\n![Figure [1]](chart.png) and ![]([x].png)";
        let result = remediate(vec![Cell::markdown(cell)]);
        assert_eq!(
            source(&result, 0),
            "# T\n![Figure [1]](chart.png) and ![Image description needed]([x].png)"
        );
    }

    #[test]
    fn test_url_with_parentheses_wrapped_whole() {
        let result = remediate(vec![Cell::markdown(
            "# T\nSee https://en.wikipedia.org/wiki/Python_(programming_language) now",
        )]);
        assert_eq!(
            source(&result, 0),
            "# T\nSee [https://en.wikipedia.org/wiki/Python_(programming_language)]\
             (https://en.wikipedia.org/wiki/Python_(programming_language)) now"
        );
        let second = Remediator::default().remediate(&result.notebook);
        assert!(second.changes.is_empty());
    }

    #[test]
    fn test_placeholder_with_markup_is_refused() {
        let remediator = Remediator::new(RemediationSettings {
            alt_text_placeholder: "*describe me*".to_string(),
            ..RemediationSettings::default()
        });
        let result = remediator.remediate(&Notebook::new(vec![Cell::markdown("# T\n![](a.png)")]));
        assert!(result.changes.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(source(&result, 0), "# T\n![](a.png)");
    }

    #[test]
    fn test_empty_alt_left_alone() {
        let result = remediate(vec![Cell::markdown("# T\n<img src=\"divider.png\" alt=\"\">")]);
        assert!(result.changes.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_ambiguous_tag_skipped() {
        let cell = "# T\n<img src=\"pic alt=x.png\"> then https://example.org";
        let result = remediate(vec![Cell::markdown(cell)]);

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].category, Category::MissingAltText);
        assert_eq!(result.skipped[0].cell_index, Some(0));
        // the independent URL fix still applies
        assert_eq!(result.changes_for(Category::BareUrl).len(), 1);
        assert!(source(&result, 0).starts_with("# T\n<img src=\"pic alt=x.png\">"));
    }

    #[test]
    fn test_second_run_is_noop() {
        let cells = vec![
            Cell::markdown("![](a.png) <img src=\"b.png\">"),
            Cell::code("plot()"),
            Cell::markdown("Data: https://data.example.org/x.csv, docs at ftp://files.example.org."),
        ];
        let first = remediate(cells);
        assert!(!first.changes.is_empty());

        let second = Remediator::default().remediate(&first.notebook);
        assert!(second.changes.is_empty(), "second run changed: {:?}", second.changes);
        assert_eq!(second.notebook, first.notebook);
    }

    #[test]
    fn test_original_untouched() {
        let notebook = Notebook::new(vec![Cell::markdown("![](a.png)")]);
        let before = notebook.clone();
        let result = Remediator::default().remediate(&notebook);
        assert_eq!(notebook, before);
        assert_ne!(result.notebook, before);
    }

    #[test]
    fn test_code_and_raw_cells_never_edited() {
        let result = remediate(vec![
            Cell::markdown("# T"),
            Cell::code("url = 'https://example.org'"),
            Cell::raw("https://example.org ![](x.png)"),
        ]);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_custom_placeholders() {
        let remediator = Remediator::new(RemediationSettings {
            title_placeholder: "Usage Analysis".to_string(),
            alt_text_placeholder: "TODO: \"describe\"".to_string(),
        });
        let result = remediator.remediate(&Notebook::new(vec![Cell::markdown("<img src=\"a.png\">")]));
        assert_eq!(source(&result, 0), "# Usage Analysis");
        assert_eq!(source(&result, 1), "<img src=\"a.png\" alt=\"TODO: &quot;describe&quot;\">");
    }
}
