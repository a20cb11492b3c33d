// SPDX-License-Identifier: PMPL-1.0-or-later
//! Notebookbot - WCAG 2.1 accessibility auditing for Jupyter notebooks
//!
//! Notebookbot scans the markdown and code cells of a notebook against a
//! fixed catalogue of accessibility rules, aggregates the findings into a
//! severity-tiered report, and can apply deterministic fixes for the issues
//! that have a mechanical repair.
//!
//! ## Rules
//!
//! - **Heading Structure** (1.3.1): First heading is H1, no skipped levels
//! - **Missing Title** (2.4.2): An H1 title before any H2 section
//! - **Alt Text** (1.1.1): Markdown and HTML images carry alternative text
//! - **Chart Description** (1.1.1): Plots are described in adjacent markdown
//! - **Color Dependence** (1.4.1): Color is not the only encoding
//! - **Table Header** (1.3.1): Markdown and HTML tables have header rows
//! - **Link Quality** (2.4.4): No bare URLs or "click here" links
//! - **Code Context** (3.1.5): Runs of code cells are explained
//!
//! ## Fixes
//!
//! Missing titles, missing alt text and bare URLs are repaired by the
//! [`remediate::Remediator`], which never mutates its input and is a no-op
//! when run on its own output.

pub mod audit;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod issue;
pub mod markdown;
pub mod notebook;
pub mod remediate;
pub mod report;
pub mod rules;
pub mod scanner;

pub use audit::{AuditReport, Auditor, SeverityCounts};
pub use catalogue::Catalogue;
pub use issue::{Category, Issue, Severity};
pub use notebook::{Cell, CellKind, Notebook, OutputArtifact};
pub use remediate::{ChangeRecord, Remediation, Remediator, SkippedFix};
