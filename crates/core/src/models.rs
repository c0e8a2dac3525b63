use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Suffix appended to module names that resolve to a file next to the scanned source
pub const LOCAL_FILE_SUFFIX: &str = " (local file)";

/// Where a module reference points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefOrigin {
    /// Ordinary import, resolved against the installed packages
    Ordinary,
    /// A `<name>.py` file sits beside the scanned source
    LocalFile,
}

/// A top-level module named by an import statement.
///
/// Ordering is by name, then origin. Because identifier characters all sort
/// after the space in [`LOCAL_FILE_SUFFIX`], this matches the lexicographic
/// order of the display names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleRef {
    pub name: String,
    pub origin: RefOrigin,
}

impl ModuleRef {
    pub fn ordinary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: RefOrigin::Ordinary,
        }
    }

    pub fn local_file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: RefOrigin::LocalFile,
        }
    }

    pub fn is_local_file(&self) -> bool {
        self.origin == RefOrigin::LocalFile
    }

    /// Name as shown to the user, with the local-file suffix when tagged
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            RefOrigin::Ordinary => f.write_str(&self.name),
            RefOrigin::LocalFile => write!(f, "{}{}", self.name, LOCAL_FILE_SUFFIX),
        }
    }
}

/// Outcome of resolving a single module reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    /// Ships with the Python runtime
    StandardLibrary,
    /// Sibling `.py` file of the scanned source
    LocalFile,
    /// Installed with the given version
    Resolved { version: String },
    /// Not found in the package index
    Unresolved,
}

impl Classification {
    /// Installable entries are everything that is not standard library or local
    pub fn is_installable(&self) -> bool {
        matches!(
            self,
            Classification::Resolved { .. } | Classification::Unresolved
        )
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Classification::Resolved { version } => Some(version),
            _ => None,
        }
    }
}

/// A module reference annotated with its distribution package and classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedModule {
    pub reference: ModuleRef,
    /// Distribution name after alias mapping
    pub package: String,
    pub classification: Classification,
}

/// Which statement form produced an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import x.y`
    Import,
    /// `from x.y import z`
    From,
}

/// A single import statement as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatement {
    /// Dotted module path, without any leading relative dots
    pub module: String,
    pub kind: ImportKind,
    /// Number of leading dots on a relative `from` import
    #[serde(default)]
    pub level: usize,
    /// Line number in source (1-based)
    pub line: usize,
    /// Column position
    pub column: usize,
    /// Alias if any (e.g., `import numpy as np`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ImportStatement {
    /// First segment of the dotted path
    pub fn top_level(&self) -> &str {
        self.module.split('.').next().unwrap_or(&self.module)
    }
}

/// Kind of file being scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Plain `.py` source
    Python,
    /// Jupyter `.ipynb` notebook
    Notebook,
}

impl SourceKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" => Some(SourceKind::Python),
            "ipynb" => Some(SourceKind::Notebook),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| Self::from_extension(&ext.to_string_lossy()))
    }
}

/// Output format of the generated manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    /// Flat `requirements.txt` style list
    #[default]
    Pip,
    /// Indented `environment.yml` style list under a named environment
    Conda,
}

impl ManifestFormat {
    /// File extension (without dot) a saved manifest must carry
    pub fn extension(&self) -> &'static str {
        match self {
            ManifestFormat::Pip => "txt",
            ManifestFormat::Conda => "yml",
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestFormat::Pip => f.write_str("pip"),
            ManifestFormat::Conda => f.write_str("conda"),
        }
    }
}

/// Rendered manifest: display lines plus the installable text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format: ManifestFormat,
    /// Human-readable lines, one per entry (plus the conda header)
    pub lines: Vec<String>,
    /// Text suitable for `pip install -r` / `conda env update -f`
    pub installable: String,
}

impl Manifest {
    /// Display lines joined with a trailing newline each
    pub fn display_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    pub fn has_content(&self) -> bool {
        !self.installable.is_empty()
    }
}

/// Counts per classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStats {
    pub total_modules: usize,
    pub stdlib_modules: usize,
    pub local_modules: usize,
    pub resolved_modules: usize,
    pub unresolved_modules: usize,
}

impl ClassificationStats {
    pub fn from_modules(modules: &[ResolvedModule]) -> Self {
        let mut stats = Self {
            total_modules: modules.len(),
            ..Default::default()
        };

        for module in modules {
            match module.classification {
                Classification::StandardLibrary => stats.stdlib_modules += 1,
                Classification::LocalFile => stats.local_modules += 1,
                Classification::Resolved { .. } => stats.resolved_modules += 1,
                Classification::Unresolved => stats.unresolved_modules += 1,
            }
        }

        stats
    }
}

/// Scan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_duration_ms: u64,
    pub timestamp: String,
    pub tool_version: String,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            scan_duration_ms: 0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Everything learned about one scanned file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub source: PathBuf,
    pub kind: SourceKind,
    pub modules: Vec<ResolvedModule>,
    pub stats: ClassificationStats,
    pub manifest: Manifest,
    pub metadata: ScanMetadata,
}
