//! CLI support for strata
//!
//! Provides programmatic access to the `strata` commands, so the same
//! compile and run behavior can be embedded in other tools.

mod compile;
mod run;

pub use compile::{CompileOptions, execute_compile};
pub use run::{RunOptions, execute_run};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Parse(#[from] crate::ParseError),

    #[error(transparent)]
    Query(#[from] crate::QueryError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Well-formed JSON with the wrong shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}
