// SPDX-License-Identifier: PMPL-1.0-or-later
//! Color dependence rule - WCAG 1.4.1 Use of Color (Level A)
//!
//! | Where    | Pattern                                          | Result  |
//! |----------|--------------------------------------------------|---------|
//! | code     | `pie(` chart construction                        | Warning |
//! | code     | plotting call with a color argument only         | Warning |
//! | markdown | "see the red", "shown in green", ...              | Warning |
//!
//! A plotting call is color-only when it passes `color=`, `c=`, `hue=`,
//! `cmap=` or `palette=` but none of the arguments that give a second cue
//! (labels, markers, hatching, line styles, shapes, text).

use crate::issue::{Category, Issue};
use crate::markdown;
use crate::notebook::Notebook;
use crate::rules::{Rule, RuleContext, RuleError};
use regex::Regex;
use std::sync::LazyLock;

static PIE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpie\s*\(").expect("valid regex"));

static PLOT_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:plot|scatter|bar|barh|hist|fill_between|stackplot|line|area|encode|scatterplot|lineplot|barplot)\s*\(",
    )
    .expect("valid regex")
});

static COLOR_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:color|colors|c|hue|cmap|palette)\s*=[^=]").expect("valid regex")
});

static DIFFERENTIATOR_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:label|labels|marker|markers|hatch|linestyle|ls|style|dashes|shape|strokeDash|text|detail|symbol|line_dash|pattern_shape)\s*=[^=]",
    )
    .expect("valid regex")
});

static COLOR_PROSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:see the|shown in|highlighted in|marked in|colou?red)\s+(red|green|blue|yellow|orange|purple|pink)\b",
    )
    .expect("valid regex")
});

/// Rule for information conveyed by color alone
pub struct ColorDependenceRule;

impl Rule for ColorDependenceRule {
    fn name(&self) -> &str {
        "Color Dependence"
    }

    fn description(&self) -> &str {
        "Checks charts and prose for information conveyed only by color (WCAG 1.4.1)"
    }

    fn check(&self, notebook: &Notebook, ctx: &RuleContext<'_>) -> Result<Vec<Issue>, RuleError> {
        let mut issues = Vec::new();

        for cell in notebook.cells() {
            if cell.is_code() {
                let code = without_comment_lines(&cell.source);

                for m in PIE_RE.find_iter(&code) {
                    issues.push(
                        ctx.catalogue
                            .issue(
                                Category::ColorDependence,
                                Some(cell.index()),
                                self.name(),
                                "Pie chart detected - slices are distinguished by color alone",
                            )
                            .with_element(&markdown::excerpt(&code[m.start()..], 60)),
                    );
                }

                for m in PLOT_CALL_RE.find_iter(&code) {
                    let call = call_text(&code, m.start(), m.end());
                    let args = &call[m.end() - m.start()..];
                    if COLOR_ARG_RE.is_match(args) && !DIFFERENTIATOR_ARG_RE.is_match(args) {
                        issues.push(
                            ctx.catalogue
                                .issue(
                                    Category::ColorDependence,
                                    Some(cell.index()),
                                    self.name(),
                                    "Plot sets color without labels, markers or patterns to tell series apart",
                                )
                                .with_element(&markdown::excerpt(call, 80)),
                        );
                    }
                }
            } else if cell.is_markdown() {
                if let Some(caps) = COLOR_PROSE_RE.captures(&cell.source) {
                    issues.push(
                        ctx.catalogue
                            .issue(
                                Category::ColorDependence,
                                Some(cell.index()),
                                self.name(),
                                &format!(
                                    "Content may rely on color perception (\"{}\")",
                                    caps[1].to_lowercase()
                                ),
                            )
                            .with_element(&caps[0]),
                    );
                }
            }
        }

        Ok(issues)
    }
}

/// Blank out whole-line Python comments
fn without_comment_lines(source: &str) -> String {
    source
        .lines()
        .map(|line| if line.trim_start().starts_with('#') { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Source of a call from its name through the matching closing parenthesis
/// (or the end of the cell when unbalanced). `open_end` is the offset just
/// past the opening parenthesis.
fn call_text(code: &str, start: usize, open_end: usize) -> &str {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in code[open_end..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return &code[start..open_end + offset + 1];
                }
            }
            _ => {}
        }
    }

    &code[start..]
}
