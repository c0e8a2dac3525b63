//! Import extraction
//!
//! Turns a `.py` file or `.ipynb` notebook into the sorted set of top-level
//! modules it imports.

use crate::models::{ImportKind, ImportStatement, ModuleRef, SourceKind};
use crate::parsers::{read_code_cells, ParserError, PythonParser};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No file path given")]
    MissingFilePath,
    #[error("The file {0} does not exist")]
    FileNotFound(PathBuf),
    #[error("Unsupported file type: {0} (expected .py or .ipynb)")]
    UnsupportedExtension(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse file: {0}")]
    ParseError(#[from] ParserError),
    #[error("Failed to read notebook: {0}")]
    NotebookError(#[from] serde_json::Error),
}

/// Extracts the modules imported by a single source file
pub struct ImportExtractor {
    parser: PythonParser,
}

impl ImportExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            parser: PythonParser::new()?,
        })
    }

    /// Check the path preconditions and detect the source kind
    pub fn source_kind(path: &Path) -> Result<SourceKind, ExtractError> {
        if path.as_os_str().is_empty() {
            return Err(ExtractError::MissingFilePath);
        }
        let kind = SourceKind::from_path(path)
            .ok_or_else(|| ExtractError::UnsupportedExtension(path.to_path_buf()))?;
        if !path.exists() {
            return Err(ExtractError::FileNotFound(path.to_path_buf()));
        }
        Ok(kind)
    }

    /// Extract the sorted, de-duplicated module references of a file
    pub fn extract(&mut self, path: &Path) -> Result<Vec<ModuleRef>, ExtractError> {
        self.extract_with_kind(path).map(|(_, refs)| refs)
    }

    /// Like [`extract`](Self::extract), also returning the detected source kind
    pub fn extract_with_kind(
        &mut self,
        path: &Path,
    ) -> Result<(SourceKind, Vec<ModuleRef>), ExtractError> {
        let kind = Self::source_kind(path)?;
        let content = fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut refs = BTreeSet::new();

        match kind {
            SourceKind::Python => {
                let imports = self.parser.parse(&content)?;
                collect_refs(&imports, base_dir, &mut refs);
            }
            SourceKind::Notebook => {
                for cell in read_code_cells(&content)? {
                    match self.parser.parse(&cell.source) {
                        Ok(imports) => collect_refs(&imports, base_dir, &mut refs),
                        Err(e) => {
                            debug!(cell = cell.index, error = %e, "Skipping unparsable notebook cell");
                        }
                    }
                }
            }
        }

        info!(
            path = %path.display(),
            modules = refs.len(),
            "Extracted imports"
        );

        Ok((kind, refs.into_iter().collect()))
    }
}

/// Record the top-level segment of each import.
///
/// Only `from` imports are checked for a sibling `<segment>.py` file.
fn collect_refs(imports: &[ImportStatement], base_dir: &Path, refs: &mut BTreeSet<ModuleRef>) {
    for import in imports {
        let name = import.top_level();
        if name.is_empty() {
            continue;
        }

        let reference = match import.kind {
            ImportKind::From if is_local_module(base_dir, name) => ModuleRef::local_file(name),
            _ => ModuleRef::ordinary(name),
        };
        refs.insert(reference);
    }
}

fn is_local_module(base_dir: &Path, name: &str) -> bool {
    base_dir.join(format!("{name}.py")).is_file()
}
