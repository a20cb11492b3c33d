// SPDX-License-Identifier: PMPL-1.0-or-later
//! Notebookbot CLI - accessibility audits and fixes for Jupyter notebooks

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use notebookbot::audit::Auditor;
use notebookbot::config::{self, Config};
use notebookbot::notebook::Notebook;
use notebookbot::remediate::{Remediation, Remediator};
use notebookbot::report::{self, generate_report, OutputFormat, ReportMeta};
use notebookbot::scanner;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// WCAG 2.1 accessibility auditor for Jupyter notebooks
#[derive(Parser)]
#[command(name = "notebookbot")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a notebook, or every notebook under a directory
    Check {
        /// Notebook file or directory to scan
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Apply automatic fixes to a notebook
    Fix {
        /// Notebook to fix
        notebook: PathBuf,

        /// Where to write the fixed notebook (default: <name>_accessible.ipynb)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Show the changes without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Print the change log as JSON
        #[arg(long)]
        json: bool,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// List the rules in evaluation order
    Rules,

    /// Write a default configuration file
    InitConfig {
        /// Destination (default: notebookbot.toml)
        path: Option<PathBuf>,
    },
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// Standalone HTML page
    Html,
    /// Markdown tables
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("notebookbot=debug")
    } else {
        EnvFilter::new("notebookbot=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let path = path.unwrap_or_else(config::default_config_path);
    config::load_config(&path).with_context(|| format!("loading {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { path, format, output, config, verbose } => {
            init_logging(verbose);
            let config = load_config(config)?;
            let auditor = Auditor::with_settings(config.rules);

            let (content, critical) = if path.is_dir() {
                check_directory(&path, &auditor, format.into())?
            } else {
                let report = scanner::scan_file(&path, &auditor)?;
                let meta = ReportMeta::new(&display_name(&path)).with_timestamp(Utc::now());
                (
                    generate_report(&report, format.into(), &meta, auditor.catalogue()),
                    report.has_critical(),
                )
            };
            write_output(&content, output.as_deref())?;

            if critical {
                std::process::exit(1);
            }
        }

        Commands::Fix { notebook, output, dry_run, json, config, verbose } => {
            init_logging(verbose);
            let config = load_config(config)?;

            let original = Notebook::load(&notebook)
                .with_context(|| format!("loading {}", notebook.display()))?;
            let remediation = Remediator::new(config.remediation).remediate(&original);

            if json {
                println!("{}", serde_json::to_string_pretty(&ChangeLog::from(&remediation))?);
            } else {
                print_change_log(&remediation);
            }

            if dry_run || remediation.is_unchanged() {
                if remediation.is_unchanged() {
                    eprintln!("Nothing to fix");
                }
                return Ok(());
            }

            let destination = output.unwrap_or_else(|| fixed_path(&notebook));
            remediation.notebook.save(&destination)?;
            eprintln!("Fixed notebook written to {}", destination.display());
        }

        Commands::Rules => {
            let auditor = Auditor::default();
            for (n, rule) in auditor.registry().rules().enumerate() {
                println!("{}. {} - {}", n + 1, rule.name(), rule.description());
            }
        }

        Commands::InitConfig { path } => {
            let path = path.unwrap_or_else(config::default_config_path);
            config::write_default_config(&path)?;
            println!("Created configuration file: {}", path.display());
        }
    }

    Ok(())
}

/// Audit every notebook under `dir`; returns the rendered output and
/// whether any notebook has a critical issue
fn check_directory(dir: &Path, auditor: &Auditor, format: OutputFormat) -> anyhow::Result<(String, bool)> {
    let scan = scanner::scan_directory(dir, auditor)?;
    let generated_at = Utc::now();

    let content = match format {
        OutputFormat::Json => {
            let notebooks: Vec<serde_json::Value> = scan
                .audits
                .iter()
                .map(|a| {
                    let meta = ReportMeta::new(&a.path.display().to_string()).with_timestamp(generated_at);
                    report::to_json_value(&a.report, &meta, auditor.catalogue())
                })
                .collect();
            let failures: Vec<serde_json::Value> = scan
                .failures
                .iter()
                .map(|f| serde_json::json!({ "path": f.path.display().to_string(), "reason": f.reason }))
                .collect();
            serde_json::to_string_pretty(&serde_json::json!({
                "notebooks": notebooks,
                "failures": failures,
            }))?
        }
        _ => {
            let mut sections: Vec<String> = scan
                .audits
                .iter()
                .map(|a| {
                    let meta = ReportMeta::new(&a.path.display().to_string()).with_timestamp(generated_at);
                    generate_report(&a.report, format, &meta, auditor.catalogue())
                })
                .collect();
            for failure in &scan.failures {
                sections.push(format!("Could not audit {}: {}\n", failure.path.display(), failure.reason));
            }
            if sections.is_empty() {
                sections.push(format!("No notebooks found under {}\n", dir.display()));
            }
            sections.join("\n")
        }
    };

    Ok((content, scan.has_critical()))
}

#[derive(serde::Serialize)]
struct ChangeLog<'a> {
    changes: &'a [notebookbot::ChangeRecord],
    skipped: &'a [notebookbot::SkippedFix],
}

impl<'a> From<&'a Remediation> for ChangeLog<'a> {
    fn from(remediation: &'a Remediation) -> Self {
        Self {
            changes: &remediation.changes,
            skipped: &remediation.skipped,
        }
    }
}

fn print_change_log(remediation: &Remediation) {
    for change in &remediation.changes {
        println!("[{}] Cell {}", change.category, change.cell_index + 1);
        if !change.before.is_empty() {
            println!("  - {}", change.before);
        }
        println!("  + {}", change.after);
    }
    for skip in &remediation.skipped {
        let location = skip
            .cell_index
            .map(|i| format!("Cell {}", i + 1))
            .unwrap_or_else(|| "Notebook".to_string());
        println!("[{}] {} skipped: {}", skip.category, location, skip.reason);
    }
    println!(
        "{} change(s) applied, {} skipped",
        remediation.changes.len(),
        remediation.skipped.len()
    );
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `analysis.ipynb` -> `analysis_accessible.ipynb`
fn fixed_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "notebook".to_string());
    path.with_file_name(format!("{}_accessible.ipynb", stem))
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
