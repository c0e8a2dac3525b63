//! Installed-package metadata index
//!
//! Answers "which version of distribution X is installed?" for the Python
//! environment being inspected. Lookups are never cached, so every scan sees
//! the environment as it currently is.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid separator pattern"));

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),
    #[error("Failed to query interpreter {interpreter}: {message}")]
    InterpreterError {
        interpreter: PathBuf,
        message: String,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Source of installed package versions
pub trait PackageIndex {
    /// Installed version of a distribution package
    fn version(&self, package: &str) -> Result<String, IndexError>;
}

/// Normalize a distribution name (PEP 503)
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS.replace_all(name, "-").to_lowercase()
}

/// Index over the `*.dist-info` / `*.egg-info` entries of site-packages directories
#[derive(Debug, Clone, Default)]
pub struct SitePackagesIndex {
    search_paths: Vec<PathBuf>,
}

impl SitePackagesIndex {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Use the `sys.path` of the given interpreter
    pub fn from_interpreter(python: &Path) -> Result<Self, IndexError> {
        let output = Command::new(python)
            .args(["-c", "import sys\nfor p in sys.path:\n    print(p)"])
            .output()
            .map_err(|e| IndexError::InterpreterError {
                interpreter: python.to_path_buf(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(IndexError::InterpreterError {
                interpreter: python.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let search_paths: Vec<PathBuf> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .filter(|path| path.is_dir())
            .collect();

        debug!(
            interpreter = %python.display(),
            paths = search_paths.len(),
            "Discovered package search paths"
        );

        Ok(Self::new(search_paths))
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn find_in_dir(&self, dir: &Path, normalized: &str) -> Option<String> {
        let prefix = format!("{normalized}-");

        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| {
                let file_name = entry.file_name().to_string_lossy();
                (file_name.ends_with(".dist-info") || file_name.ends_with(".egg-info"))
                    && normalize_name(&file_name).starts_with(&prefix)
            })
            .find_map(|entry| {
                let metadata = read_metadata(entry.path())?;
                (normalize_name(&metadata.name) == normalized).then_some(metadata.version)
            })
    }
}

impl PackageIndex for SitePackagesIndex {
    fn version(&self, package: &str) -> Result<String, IndexError> {
        let normalized = normalize_name(package);

        self.search_paths
            .iter()
            .find_map(|dir| self.find_in_dir(dir, &normalized))
            .ok_or_else(|| IndexError::PackageNotFound(package.to_string()))
    }
}

struct DistMetadata {
    name: String,
    version: String,
}

/// Read `Name` and `Version` from a dist-info/egg-info entry
fn read_metadata(entry: &Path) -> Option<DistMetadata> {
    let file = if entry.is_dir() {
        ["METADATA", "PKG-INFO"]
            .iter()
            .map(|name| entry.join(name))
            .find(|path| path.is_file())?
    } else {
        entry.to_path_buf()
    };

    let content = fs::read_to_string(file).ok()?;
    parse_metadata(&content)
}

/// Parse the RFC 822 style header block of a metadata file
fn parse_metadata(content: &str) -> Option<DistMetadata> {
    let mut name = None;
    let mut version = None;

    for line in content.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Name:") {
            name.get_or_insert_with(|| value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Version:") {
            version.get_or_insert_with(|| value.trim().to_string());
        }
    }

    Some(DistMetadata {
        name: name?,
        version: version?,
    })
}

/// Fixed name -> version index
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    versions: HashMap<String, String>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, name: &str, version: &str) -> Self {
        self.versions
            .insert(normalize_name(name), version.to_string());
        self
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for InMemoryIndex {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            versions: iter
                .into_iter()
                .map(|(n, v)| (normalize_name(n.as_ref()), v.into()))
                .collect(),
        }
    }
}

impl PackageIndex for InMemoryIndex {
    fn version(&self, package: &str) -> Result<String, IndexError> {
        self.versions
            .get(&normalize_name(package))
            .cloned()
            .ok_or_else(|| IndexError::PackageNotFound(package.to_string()))
    }
}
