// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for notebookbot

use crate::notebook::ParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotebookbotError>;

/// Main error type for notebookbot
#[derive(Error, Debug)]
pub enum NotebookbotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notebook parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
