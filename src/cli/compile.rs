//! Compile a query and print its canonical form

use super::CliError;
use crate::{compile, serialize};

/// Options for the compile command
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// The query text
    pub query: String,
    /// Print the compiled tree instead of the canonical text
    pub tree: bool,
}

/// Compiles the query and renders it.
pub fn execute_compile(options: &CompileOptions) -> Result<String, CliError> {
    let query = compile(&options.query)?;
    if options.tree {
        Ok(format!("{:#?}", query))
    } else {
        Ok(serialize(&query))
    }
}
