// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for notebookbot

use notebookbot::audit::Auditor;
use notebookbot::catalogue::Catalogue;
use notebookbot::issue::{Category, Severity};
use notebookbot::notebook::{Cell, Notebook};
use notebookbot::report::{generate_report, OutputFormat, ReportMeta};
use notebookbot::rules::{Rule, RuleContext, RuleError, RuleRegistry};
use notebookbot::scanner;
use std::path::Path;

fn audit_fixture(name: &str) -> notebookbot::AuditReport {
    scanner::scan_file(&Path::new("tests/fixtures").join(name), &Auditor::default())
        .expect("scan should succeed")
}

fn count(report: &notebookbot::AuditReport, category: Category) -> usize {
    report.by_category(category).len()
}

#[test]
fn test_scan_accessible_fixture() {
    let report = audit_fixture("accessible.ipynb");
    let counts = report.counts();

    assert_eq!(
        (counts.critical, counts.warning),
        (0, 0),
        "Accessible fixture should be clean, got {:?}",
        report.issues().iter().map(|i| i.category).collect::<Vec<_>>()
    );
    assert_eq!(counts.success, 1, "the one described image should be confirmed");
    assert!(!report.has_critical());
}

#[test]
fn test_scan_inaccessible_fixture() {
    let report = audit_fixture("inaccessible.ipynb");
    let counts = report.counts();

    assert_eq!(counts.critical, 1, "only the image without alt text is critical");
    assert_eq!(counts.warning, 12);
    assert_eq!(counts.success, 0);

    assert_eq!(count(&report, Category::MissingTitle), 1);
    assert_eq!(count(&report, Category::HeadingStructure), 1);
    assert_eq!(count(&report, Category::HeadingHierarchySkip), 1);
    assert_eq!(count(&report, Category::MissingChartDescription), 1);
    assert_eq!(count(&report, Category::ColorDependence), 3);
    assert_eq!(count(&report, Category::TableNoHeader), 1);
    assert_eq!(count(&report, Category::BareUrl), 1);
    assert_eq!(count(&report, Category::NonDescriptiveLink), 1);
    assert_eq!(count(&report, Category::CodeContext), 2);

    let missing_alt = report.by_category(Category::MissingAltText);
    assert_eq!(missing_alt[0].cell_index, Some(3));
    assert_eq!(missing_alt[0].severity, Severity::Critical);

    let code_context: Vec<Option<usize>> = report
        .by_category(Category::CodeContext)
        .iter()
        .map(|i| i.cell_index)
        .collect();
    assert_eq!(code_context, vec![Some(1), Some(6)]);
}

#[test]
fn test_scan_partial_fixture() {
    let report = audit_fixture("partial.ipynb");
    let counts = report.counts();

    assert_eq!((counts.critical, counts.warning, counts.success), (1, 2, 1));
    assert_eq!(count(&report, Category::EmptyAltText), 1, "alt=\"\" is reported but not critical");
    assert_eq!(report.by_category(Category::MissingAltText)[0].cell_index, Some(1));
}

#[test]
fn test_scan_fixtures_directory() {
    let scan = scanner::scan_directory(Path::new("tests/fixtures"), &Auditor::default())
        .expect("directory scan should succeed");

    assert_eq!(scan.audits.len(), 3, "all three fixtures should be audited");
    assert!(scan.failures.is_empty());
    assert!(scan.has_critical());
}

#[test]
fn test_missing_alt_image_alone() {
    let notebook = Notebook::new(vec![Cell::markdown("![](chart.png)")]);
    let report = Auditor::default().audit(&notebook);

    let alt = report.by_category(Category::MissingAltText);
    assert_eq!(alt.len(), 1);
    assert_eq!(alt[0].cell_index, Some(0));
    assert_eq!(alt[0].severity, Severity::Critical);
    assert_eq!(report.counts().success, 0);
}

#[test]
fn test_heading_examples() {
    let auditor = Auditor::default();

    let clean = auditor.audit(&Notebook::new(vec![Cell::markdown("# Title\n## Sub")]));
    assert_eq!(count(&clean, Category::HeadingStructure), 0);
    assert_eq!(count(&clean, Category::HeadingHierarchySkip), 0);

    let skipping = auditor.audit(&Notebook::new(vec![Cell::markdown("## Sub\n###### Deep")]));
    assert_eq!(count(&skipping, Category::HeadingHierarchySkip), 1);
}

#[test]
fn test_audit_is_deterministic() {
    let notebook = Notebook::load(Path::new("tests/fixtures/inaccessible.ipynb")).expect("load");
    let auditor = Auditor::default();
    assert_eq!(auditor.audit(&notebook), auditor.audit(&notebook));
}

#[test]
fn test_every_issue_has_catalogue_metadata() {
    let report = audit_fixture("inaccessible.ipynb");
    let catalogue = Catalogue::standard();

    for issue in report.issues() {
        assert_eq!(issue.severity, issue.category.severity());
        assert_eq!(issue.wcag_reference, catalogue.entry(issue.category).wcag_reference);
        assert!(!issue.fix_hint.is_empty(), "{} has no fix hint", issue.category);
    }
}

struct BrokenRule;

impl Rule for BrokenRule {
    fn name(&self) -> &str {
        "Broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn check(&self, _notebook: &Notebook, _ctx: &RuleContext<'_>) -> Result<Vec<notebookbot::Issue>, RuleError> {
        Err(RuleError("unreadable markup".to_string()))
    }
}

#[test]
fn test_rule_failure_surfaces_as_warning() {
    let mut rules: Vec<Box<dyn Rule>> = vec![Box::new(BrokenRule)];
    rules.push(Box::new(notebookbot::rules::alt_text::AltTextRule));
    let auditor = Auditor::new(
        RuleRegistry::from_rules(rules),
        Catalogue::standard(),
        Default::default(),
    );

    let report = auditor.audit(&Notebook::new(vec![Cell::markdown("![](x.png)")]));

    let failures = report.by_category(Category::InternalRuleFailure);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::Warning);
    assert_eq!(failures[0].cell_index, None);
    assert_eq!(count(&report, Category::MissingAltText), 1, "later rules still run");
}

#[test]
fn test_json_report_for_fixture() {
    let report = audit_fixture("inaccessible.ipynb");
    let json = generate_report(
        &report,
        OutputFormat::Json,
        &ReportMeta::new("inaccessible.ipynb"),
        &Catalogue::standard(),
    );
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");

    assert_eq!(parsed["summary"]["critical"], 1);
    assert_eq!(parsed["summary"]["warning"], 12);
    assert_eq!(parsed["summary"]["total"], 13);
    assert_eq!(parsed["issues"][0]["category"], "MISSING_ALT_TEXT");
    assert!(parsed["generated_at"].is_null());
}
