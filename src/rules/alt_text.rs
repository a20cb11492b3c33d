// SPDX-License-Identifier: PMPL-1.0-or-later
//! Image alt text rule - WCAG 1.1.1 Non-text Content (Level A)
//!
//! Every image reference in a markdown cell, in either `![alt](url)` or
//! `<img alt="...">` syntax, yields exactly one record:
//! - No alt text, or alt text of whitespace only: Critical
//! - `alt=""` on an HTML image: Warning (declared decorative)
//! - Anything else: Success

use crate::issue::{Category, Issue};
use crate::markdown::{self, AltText, ImageSyntax};
use crate::notebook::Notebook;
use crate::rules::{Rule, RuleContext, RuleError};

/// Rule for image alt text
pub struct AltTextRule;

impl Rule for AltTextRule {
    fn name(&self) -> &str {
        "Alt Text"
    }

    fn description(&self) -> &str {
        "Checks markdown and HTML images for alt text (WCAG 1.1.1)"
    }

    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
        let mut issues = Vec::new();

        for cell in notebook.markdown_cells() {
            for image in markdown::image_refs(&cell.source)? {
                let element = markdown::excerpt(image.text(&cell.source), 80);
                let kind = match image.syntax {
                    ImageSyntax::Markdown => "Image",
                    ImageSyntax::Html => "HTML image",
                };

                let (category, message) = match &image.alt {
                    AltText::Missing => (
                        Category::MissingAltText,
                        format!("{} is missing alt text description", kind),
                    ),
                    AltText::Blank => (
                        Category::MissingAltText,
                        format!("{} alt text contains only whitespace", kind),
                    ),
                    AltText::Empty => (
                        Category::EmptyAltText,
                        format!("{} has empty alt attribute (treated as decorative)", kind),
                    ),
                    AltText::Present(alt) => (
                        Category::ImageAltText,
                        format!("{} has alt text: \"{}\"", kind, alt.trim()),
                    ),
                };

                issues.push(
                    ctx.catalogue
                        .issue(category, Some(cell.index()), self.name(), &message)
                        .with_element(&element),
                );
            }
        }

        Ok(issues)
    }
}
