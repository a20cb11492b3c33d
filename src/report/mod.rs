// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report generation for notebook audits.
//!
//! Supports multiple output formats:
//! - Text: human-readable findings with WCAG references
//! - JSON: structured findings for programmatic consumption
//! - HTML: standalone page for sharing
//! - Markdown: compact tables for pull request comments
//!
//! Rendering is a pure function of the report, the metadata and the
//! catalogue. The timestamp is supplied by the caller, never read here.
//! Tiers always render Critical, Warning, Success, with discovery order
//! kept inside each tier.

use crate::audit::AuditReport;
use crate::catalogue::Catalogue;
use crate::issue::{Category, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// Standalone HTML page
    Html,
    /// Markdown tables
    Markdown,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Caller-supplied report metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportMeta {
    /// Display name of the audited notebook
    pub notebook: String,
    /// When the audit ran
    pub generated_at: Option<DateTime<Utc>>,
}

impl ReportMeta {
    pub fn new(notebook: &str) -> Self {
        Self {
            notebook: notebook.to_string(),
            generated_at: None,
        }
    }

    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }
}

/// Generate a report in the given format
pub fn generate_report(
    report: &AuditReport,
    format: OutputFormat,
    meta: &ReportMeta,
    catalogue: &Catalogue,
) -> String {
    match format {
        OutputFormat::Text => generate_text_report(report, meta, catalogue),
        OutputFormat::Json => generate_json_report(report, meta, catalogue),
        OutputFormat::Html => generate_html_report(report, meta, catalogue),
        OutputFormat::Markdown => generate_markdown_report(report, meta, catalogue),
    }
}

fn tier_heading(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "Critical Issues (Must Fix)",
        Severity::Warning => "Warnings (Should Fix)",
        Severity::Success => "Successful Checks",
    }
}

fn timestamp(meta: &ReportMeta) -> Option<String> {
    meta.generated_at
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

/// Generate human-readable text report
fn generate_text_report(report: &AuditReport, meta: &ReportMeta, catalogue: &Catalogue) -> String {
    let rule = "=".repeat(72);
    let thin = "-".repeat(72);
    let counts = report.counts();
    let mut output = String::new();

    output.push_str(&format!("{}\nNOTEBOOK ACCESSIBILITY AUDIT REPORT\n{}\n", rule, rule));
    output.push_str(&format!("Notebook: {}\n", meta.notebook));
    if let Some(ts) = timestamp(meta) {
        output.push_str(&format!("Generated: {}\n", ts));
    }
    output.push('\n');

    output.push_str(&format!("SUMMARY\n{}\n", thin));
    output.push_str(&format!("Critical Issues: {}\n", counts.critical));
    output.push_str(&format!("Warnings: {}\n", counts.warning));
    output.push_str(&format!("Successful Checks: {}\n\n", counts.success));

    if report.is_empty() {
        output.push_str("No accessibility findings.\n\n");
    }

    for severity in Severity::ALL {
        let issues = report.by_severity(severity);
        if issues.is_empty() {
            continue;
        }

        output.push_str(&format!(
            "{} ({})\n{}\n",
            tier_heading(severity).to_uppercase(),
            issues.len(),
            thin
        ));

        for (n, issue) in issues.iter().enumerate() {
            if severity == Severity::Success {
                output.push_str(&format!(
                    "{}. {}: {} ({})\n",
                    n + 1,
                    issue.category,
                    issue.message,
                    issue.location_string()
                ));
                continue;
            }

            output.push_str(&format!(
                "{}. {} - {}\n",
                n + 1,
                issue.category,
                catalogue.entry(issue.category).title
            ));
            output.push_str(&format!("   Location: {}\n", issue.location_string()));
            output.push_str(&format!("   Message: {}\n", issue.message));
            if let Some(ref element) = issue.element {
                output.push_str(&format!("   Source: {}\n", element));
            }
            output.push_str(&format!("   WCAG: {}\n", issue.wcag_reference));
            output.push_str(&format!("   How to Fix: {}\n\n", issue.fix_hint));
        }
        output.push('\n');
    }

    let verdict = if report.has_critical() {
        "RESULT: FAIL (critical issues found)"
    } else if counts.warning > 0 {
        "RESULT: PASS WITH WARNINGS"
    } else {
        "RESULT: PASS"
    };
    output.push_str(&format!("{}\n{}\n", verdict, rule));

    output
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    notebook: &'a str,
    generated_at: Option<String>,
    summary: JsonSummary,
    issues: Vec<JsonIssue<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    critical: usize,
    warning: usize,
    success: usize,
    total: usize,
}

#[derive(Debug, Serialize)]
struct JsonIssue<'a> {
    category: Category,
    title: &'static str,
    severity: Severity,
    cell_index: Option<usize>,
    message: &'a str,
    wcag_reference: &'a str,
    fix_hint: &'a str,
    rule: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    element: Option<&'a str>,
}

fn json_report<'a>(report: &'a AuditReport, meta: &'a ReportMeta, catalogue: &Catalogue) -> JsonReport<'a> {
    let counts = report.counts();
    JsonReport {
        tool: "notebookbot",
        version: env!("CARGO_PKG_VERSION"),
        notebook: &meta.notebook,
        generated_at: timestamp(meta),
        summary: JsonSummary {
            critical: counts.critical,
            warning: counts.warning,
            success: counts.success,
            total: counts.total(),
        },
        issues: report
            .in_tier_order()
            .into_iter()
            .map(|issue| JsonIssue {
                category: issue.category,
                title: catalogue.entry(issue.category).title,
                severity: issue.severity,
                cell_index: issue.cell_index,
                message: &issue.message,
                wcag_reference: &issue.wcag_reference,
                fix_hint: &issue.fix_hint,
                rule: &issue.rule,
                element: issue.element.as_deref(),
            })
            .collect(),
    }
}

/// The JSON report as a value, for embedding in multi-notebook output
pub fn to_json_value(report: &AuditReport, meta: &ReportMeta, catalogue: &Catalogue) -> serde_json::Value {
    serde_json::to_value(json_report(report, meta, catalogue))
        .unwrap_or_else(|e| serde_json::json!({ "error": format!("Failed to serialize report: {}", e) }))
}

/// Generate JSON report
fn generate_json_report(report: &AuditReport, meta: &ReportMeta, catalogue: &Catalogue) -> String {
    serde_json::to_string_pretty(&json_report(report, meta, catalogue)).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize report: {}\"}}", e)
    })
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const HTML_STYLE: &str = "\
body { font-family: system-ui, sans-serif; line-height: 1.6; max-width: 1100px; margin: 0 auto; padding: 20px; color: #1a1a1a; background: #fafafa; }
.summary { display: flex; gap: 16px; margin: 16px 0 24px; }
.stat { flex: 1; padding: 12px; border-radius: 4px; text-align: center; border-left: 4px solid; }
.stat-number { font-size: 2em; font-weight: bold; }
.critical { background: #fdecec; border-color: #b00020; }
.warning { background: #fff6e0; border-color: #8a5a00; }
.success { background: #e9f6ec; border-color: #1e6b35; }
.issue { background: #fff; padding: 12px 16px; margin-bottom: 12px; border-left: 4px solid #767676; }
.issue.critical { border-color: #b00020; }
.issue.warning { border-color: #8a5a00; }
.issue.success { border-color: #1e6b35; }
.meta { color: #4a4a4a; font-size: 0.9em; }
code { background: #f0f0f0; padding: 0 4px; }
";

/// Generate a standalone HTML page
fn generate_html_report(report: &AuditReport, meta: &ReportMeta, catalogue: &Catalogue) -> String {
    let counts = report.counts();
    let name = escape_html(&meta.notebook);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str(&format!("<title>Accessibility Audit Report - {}</title>\n", name));
    html.push_str(&format!("<style>\n{}</style>\n</head>\n<body>\n<main>\n", HTML_STYLE));
    html.push_str(&format!("<h1>Notebook Accessibility Audit Report</h1>\n<p>Notebook: <code>{}</code></p>\n", name));
    if let Some(ts) = timestamp(meta) {
        html.push_str(&format!("<p class=\"meta\">Generated: <time datetime=\"{0}\">{0}</time></p>\n", ts));
    }

    html.push_str("<section class=\"summary\" aria-label=\"Summary\">\n");
    for (severity, label) in [
        (Severity::Critical, "Critical Issues"),
        (Severity::Warning, "Warnings"),
        (Severity::Success, "Successful Checks"),
    ] {
        html.push_str(&format!(
            "<div class=\"stat {}\"><div class=\"stat-number\">{}</div><div>{}</div></div>\n",
            severity.to_string().to_lowercase(),
            counts.get(severity),
            label
        ));
    }
    html.push_str("</section>\n");

    for severity in Severity::ALL {
        let issues = report.by_severity(severity);
        if issues.is_empty() {
            continue;
        }
        let class = severity.to_string().to_lowercase();

        html.push_str(&format!("<section>\n<h2>{}</h2>\n", tier_heading(severity)));
        for issue in issues {
            html.push_str(&format!("<article class=\"issue {}\">\n", class));
            html.push_str(&format!(
                "<h3>{} <span class=\"meta\">{}</span></h3>\n",
                issue.category,
                escape_html(catalogue.entry(issue.category).title)
            ));
            html.push_str(&format!(
                "<p class=\"meta\">Location: {}</p>\n<p>{}</p>\n",
                issue.location_string(),
                escape_html(&issue.message)
            ));
            if severity != Severity::Success {
                if let Some(ref element) = issue.element {
                    html.push_str(&format!("<p>Source: <code>{}</code></p>\n", escape_html(element)));
                }
                html.push_str(&format!(
                    "<p class=\"meta\">WCAG: {}</p>\n<p><strong>How to Fix:</strong> {}</p>\n",
                    escape_html(&issue.wcag_reference),
                    escape_html(&issue.fix_hint)
                ));
            }
            html.push_str("</article>\n");
        }
        html.push_str("</section>\n");
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate markdown tables, one per tier
fn generate_markdown_report(report: &AuditReport, meta: &ReportMeta, catalogue: &Catalogue) -> String {
    let counts = report.counts();
    let mut md = String::new();

    md.push_str(&format!("# Accessibility Audit: {}\n\n", meta.notebook));
    if let Some(ts) = timestamp(meta) {
        md.push_str(&format!("_Generated {}_\n\n", ts));
    }
    md.push_str("| Critical | Warning | Success |\n|---:|---:|---:|\n");
    md.push_str(&format!(
        "| {} | {} | {} |\n\n",
        counts.critical, counts.warning, counts.success
    ));

    for severity in Severity::ALL {
        let issues = report.by_severity(severity);
        if issues.is_empty() {
            continue;
        }

        md.push_str(&format!("## {}\n\n", tier_heading(severity)));
        md.push_str("| Location | Category | Message | WCAG |\n|---|---|---|---|\n");
        for issue in issues {
            md.push_str(&format!(
                "| {} | {} ({}) | {} | {} |\n",
                issue.location_string(),
                issue.category,
                escape_table_cell(catalogue.entry(issue.category).title),
                escape_table_cell(&issue.message),
                escape_table_cell(&issue.wcag_reference)
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_report() -> AuditReport {
        let catalogue = Catalogue::standard();
        AuditReport::from_issues(vec![
            catalogue.issue(Category::ImageAltText, Some(0), "Alt Text", "Image has alt text: \"a\""),
            catalogue.issue(Category::BareUrl, Some(1), "Link Quality", "Bare URL <x>"),
            catalogue.issue(Category::ImageAltText, Some(2), "Alt Text", "Image has alt text: \"b\""),
            catalogue
                .issue(Category::MissingAltText, Some(3), "Alt Text", "Image is missing alt text description")
                .with_element("![](chart.png)"),
            catalogue.issue(Category::CodeContext, Some(5), "Code Context", "no context"),
            catalogue.issue(Category::ImageAltText, Some(6), "Alt Text", "Image has alt text: \"c\""),
        ])
    }

    fn meta() -> ReportMeta {
        ReportMeta::new("usage.ipynb")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_json_counts_round_trip() {
        let report = sample_report();
        let json = generate_report(&report, OutputFormat::Json, &meta(), &Catalogue::standard());
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");

        assert_eq!(parsed["summary"]["critical"], 1);
        assert_eq!(parsed["summary"]["warning"], 2);
        assert_eq!(parsed["summary"]["success"], 3);
        assert_eq!(parsed["generated_at"], "2024-05-01T12:00:00Z");

        let issues = parsed["issues"].as_array().expect("issues array");
        assert_eq!(issues.len(), 6);
        assert_eq!(issues[0]["category"], "MISSING_ALT_TEXT");
        assert_eq!(issues[0]["severity"], "critical");
        assert_eq!(issues[0]["cell_index"], 3);
        assert!(issues[0]["wcag_reference"].as_str().unwrap().contains("1.1.1"));
        assert_eq!(issues[1]["cell_index"], 1);
        assert_eq!(issues[2]["cell_index"], 5);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let report = sample_report();
        for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Html, OutputFormat::Markdown] {
            let a = generate_report(&report, format, &meta(), &Catalogue::standard());
            let b = generate_report(&report, format, &meta(), &Catalogue::standard());
            assert_eq!(a, b, "{} output differs between runs", format);
        }
    }

    #[test]
    fn test_text_tier_order() {
        let text = generate_report(&sample_report(), OutputFormat::Text, &meta(), &Catalogue::standard());
        let critical = text.find("CRITICAL ISSUES").expect("critical section");
        let warnings = text.find("WARNINGS (SHOULD FIX)").expect("warning section");
        let success = text.find("SUCCESSFUL CHECKS (3)").expect("success section");
        assert!(critical < warnings && warnings < success);
        assert!(text.contains("Location: Cell 4"));
        assert!(text.contains("RESULT: FAIL"));
    }

    #[test]
    fn test_text_report_empty() {
        let text = generate_report(&AuditReport::default(), OutputFormat::Text, &ReportMeta::new("x"), &Catalogue::standard());
        assert!(text.contains("No accessibility findings"));
        assert!(text.contains("RESULT: PASS"));
        assert!(!text.contains("Generated:"));
    }

    #[test]
    fn test_html_escapes_content() {
        let html = generate_report(&sample_report(), OutputFormat::Html, &meta(), &Catalogue::standard());
        assert!(html.contains("Bare URL &lt;x&gt;"));
        assert!(!html.contains("Bare URL <x>"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<html lang=\"en\">"));
    }

    #[test]
    fn test_markdown_report() {
        let md = generate_report(&sample_report(), OutputFormat::Markdown, &meta(), &Catalogue::standard());
        assert!(md.starts_with("# Accessibility Audit: usage.ipynb"));
        assert!(md.contains("| 1 | 2 | 3 |"));
        assert!(md.contains("## Critical Issues (Must Fix)"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("html".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }
}
