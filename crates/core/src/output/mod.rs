mod conda;
mod json;
mod pip;
mod yaml;

pub use conda::conda_header;
pub use json::to_json;
pub use yaml::to_yaml;

use crate::models::{Classification, Manifest, ManifestFormat, ResolvedModule, ScanReport};

pub const STDLIB_COMMENT: &str = "# standard library";
pub const LOCAL_FILE_COMMENT: &str = "# local file";
pub const NOT_INSTALLED_COMMENT: &str = "# not installed";

/// How a manifest is rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub format: ManifestFormat,
    /// Annotate display lines with their classification
    pub include_comments: bool,
    /// Environment name written into the conda header
    pub env_name: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            format: ManifestFormat::Pip,
            include_comments: true,
            env_name: "env".to_string(),
        }
    }
}

impl FormatOptions {
    pub fn new(format: ManifestFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn with_comments(mut self, include: bool) -> Self {
        self.include_comments = include;
        self
    }

    pub fn with_env_name(mut self, name: impl Into<String>) -> Self {
        self.env_name = name.into();
        self
    }
}

/// Render display lines and installable text for the resolved modules.
///
/// Output depends only on the arguments, so identical inputs give identical text.
pub fn render_manifest(modules: &[ResolvedModule], options: &FormatOptions) -> Manifest {
    match options.format {
        ManifestFormat::Pip => pip::render(modules, options.include_comments),
        ManifestFormat::Conda => conda::render(modules, options),
    }
}

/// Report output options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The manifest display text
    Text,
    Json,
    Yaml,
}

/// Format a scan report according to the specified format
pub fn format_output(report: &ScanReport, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Text => Ok(report.manifest.display_text()),
        OutputFormat::Json => to_json(report),
        OutputFormat::Yaml => to_yaml(report),
    }
}

/// Line-level layout shared by both manifest formats
struct EntryStyle {
    /// Written before every entry
    prefix: &'static str,
    /// Between package name and version
    pin: &'static str,
}

fn with_comment(entry: String, comment: &str, include_comments: bool) -> String {
    if include_comments {
        format!("{entry}  {comment}")
    } else {
        entry
    }
}

/// Human-readable line for one module, keyed by its import name
fn display_entry(module: &ResolvedModule, include_comments: bool, style: &EntryStyle) -> String {
    let name = &module.reference.name;
    let prefix = style.prefix;

    match &module.classification {
        Classification::StandardLibrary => {
            with_comment(format!("{prefix}{name}"), STDLIB_COMMENT, include_comments)
        }
        Classification::LocalFile => with_comment(
            format!("{prefix}{}", module.reference),
            LOCAL_FILE_COMMENT,
            include_comments,
        ),
        Classification::Resolved { version } => format!("{prefix}{name}{}{version}", style.pin),
        Classification::Unresolved => {
            with_comment(format!("{prefix}{name}"), NOT_INSTALLED_COMMENT, include_comments)
        }
    }
}

/// Installable line for one module, keyed by its package name.
///
/// Standard library and local entries have none.
fn installable_entry(module: &ResolvedModule, style: &EntryStyle) -> Option<String> {
    let package = &module.package;
    let prefix = style.prefix;

    match &module.classification {
        Classification::Resolved { version } => {
            Some(format!("{prefix}{package}{}{version}", style.pin))
        }
        Classification::Unresolved => Some(format!("{prefix}{package}  {NOT_INSTALLED_COMMENT}")),
        Classification::StandardLibrary | Classification::LocalFile => None,
    }
}

/// Append entry lines for every module to a manifest
fn push_entries(
    manifest: &mut Manifest,
    modules: &[ResolvedModule],
    include_comments: bool,
    style: &EntryStyle,
) {
    for module in modules {
        manifest
            .lines
            .push(display_entry(module, include_comments, style));

        if let Some(line) = installable_entry(module, style) {
            manifest.installable.push_str(&line);
            manifest.installable.push('\n');
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}
