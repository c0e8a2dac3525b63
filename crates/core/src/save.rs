use crate::models::{Manifest, ManifestFormat};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Nothing to save: generate the environment file first")]
    NoContent,
    #[error("{path} must be saved with the .{expected} extension for the {format} format")]
    ExtensionMismatch {
        path: PathBuf,
        format: ManifestFormat,
        expected: &'static str,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Check that `path` carries the extension the format requires
pub fn check_extension(path: &Path, format: ManifestFormat) -> Result<(), SaveError> {
    let expected = format.extension();
    match path.extension() {
        Some(ext) if ext == expected => Ok(()),
        _ => Err(SaveError::ExtensionMismatch {
            path: path.to_path_buf(),
            format,
            expected,
        }),
    }
}

/// Write the installable manifest to `path`.
///
/// Nothing is written unless the manifest has content and the extension matches.
pub fn save_manifest(manifest: &Manifest, path: &Path) -> Result<(), SaveError> {
    if !manifest.has_content() {
        return Err(SaveError::NoContent);
    }
    check_extension(path, manifest.format)?;

    fs::write(path, &manifest.installable)?;
    info!(path = %path.display(), format = %manifest.format, "Saved environment file");
    Ok(())
}
