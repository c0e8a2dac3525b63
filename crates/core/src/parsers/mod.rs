mod notebook;
mod python;

pub use notebook::{read_code_cells, CodeCell};
pub use python::PythonParser;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to initialize parser: {0}")]
    InitError(String),
    #[error("Failed to parse source code: syntax error at line {line}, column {column}")]
    ParseError { line: usize, column: usize },
}
