// SPDX-License-Identifier: PMPL-1.0-or-later
//! Directory scanner for auditing every notebook under a path.
//!
//! Walks directory trees, loads `.ipynb` files and audits each one. A
//! notebook that cannot be read or parsed is recorded as a failure and the
//! scan moves on.

use crate::audit::{AuditReport, Auditor};
use crate::notebook::Notebook;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Notebook file extension
const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Directories to skip
const SKIP_DIRS: &[&str] = &[
    ".ipynb_checkpoints", "node_modules", ".git", "target", "dist", "build",
    "_build", "vendor", "__pycache__", ".venv", "venv",
];

/// Audit of one notebook file
#[derive(Debug, Clone)]
pub struct NotebookAudit {
    pub path: PathBuf,
    pub report: AuditReport,
}

/// A notebook that could not be audited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of scanning a directory
#[derive(Debug, Clone, Default)]
pub struct DirectoryScan {
    /// Audits in path order
    pub audits: Vec<NotebookAudit>,
    pub failures: Vec<ScanFailure>,
}

impl DirectoryScan {
    /// Whether any audited notebook has a critical issue
    pub fn has_critical(&self) -> bool {
        self.audits.iter().any(|a| a.report.has_critical())
    }

    /// Total issues across all audited notebooks
    pub fn total_issues(&self) -> usize {
        self.audits.iter().map(|a| a.report.len()).sum()
    }
}

/// Whether a path names a notebook file
pub fn is_notebook(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(NOTEBOOK_EXTENSION)
}

/// Scan a directory for notebooks and audit each one
pub fn scan_directory(dir: &Path, auditor: &Auditor) -> anyhow::Result<DirectoryScan> {
    let mut scan = DirectoryScan::default();

    info!("Scanning directory: {}", dir.display());

    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // the root itself may be hidden, e.g. `.`
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_str().unwrap_or("");
            if e.file_type().is_dir() {
                return !SKIP_DIRS.contains(&name) && !name.starts_with('.');
            }
            true
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_notebook(entry.path()) {
            continue;
        }

        let path = entry.path();
        match Notebook::load(path) {
            Ok(notebook) => scan.audits.push(NotebookAudit {
                path: path.to_path_buf(),
                report: auditor.audit(&notebook),
            }),
            Err(e) => {
                warn!("Could not audit {}: {}", path.display(), e);
                scan.failures.push(ScanFailure {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Scanned {} notebooks, found {} issues, {} failed to load",
        scan.audits.len(),
        scan.total_issues(),
        scan.failures.len()
    );

    Ok(scan)
}

/// Audit a single notebook file
pub fn scan_file(path: &Path, auditor: &Auditor) -> anyhow::Result<AuditReport> {
    let notebook = Notebook::load(path)?;
    Ok(auditor.audit(&notebook))
}
