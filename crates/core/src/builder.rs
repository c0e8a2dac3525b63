use crate::config::ResolverTables;
use crate::extractor::{ExtractError, ImportExtractor};
use crate::index::PackageIndex;
use crate::models::{ClassificationStats, ScanMetadata, ScanReport};
use crate::output::{render_manifest, FormatOptions};
use crate::resolver::VersionResolver;
use std::path::Path;
use std::time::Instant;

/// Runs extraction, resolution and formatting for one file at a time.
///
/// Holds no state between calls beyond the parser and the immutable tables.
pub struct EnvBuilder {
    extractor: ImportExtractor,
    resolver: VersionResolver,
    options: FormatOptions,
}

impl EnvBuilder {
    pub fn new(
        tables: ResolverTables,
        index: Box<dyn PackageIndex>,
        options: FormatOptions,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            extractor: ImportExtractor::new()?,
            resolver: VersionResolver::new(tables, index),
            options,
        })
    }

    pub fn set_options(&mut self, options: FormatOptions) {
        self.options = options;
    }

    /// Scan `path` and produce a fresh report with its manifest
    pub fn generate(&mut self, path: &Path) -> Result<ScanReport, ExtractError> {
        let start = Instant::now();

        let (kind, refs) = self.extractor.extract_with_kind(path)?;
        let modules = self.resolver.resolve(&refs);
        let manifest = render_manifest(&modules, &self.options);

        let metadata = ScanMetadata {
            scan_duration_ms: start.elapsed().as_millis() as u64,
            ..Default::default()
        };

        Ok(ScanReport {
            source: path.to_path_buf(),
            kind,
            stats: ClassificationStats::from_modules(&modules),
            modules,
            manifest,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryIndex;
    use crate::models::{Classification, ManifestFormat, SourceKind};
    use std::fs;

    #[test]
    fn test_generate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        fs::write(&path, "import numpy as np\nimport json\n").unwrap();

        let index = InMemoryIndex::new().with_package("numpy", "1.26.4");
        let mut builder = EnvBuilder::new(
            ResolverTables::default(),
            Box::new(index),
            FormatOptions::default(),
        )
        .unwrap();

        let report = builder.generate(&path).unwrap();
        assert_eq!(report.kind, SourceKind::Python);
        assert_eq!(report.stats.total_modules, 2);
        assert_eq!(report.stats.stdlib_modules, 1);
        assert_eq!(report.modules[0].classification, Classification::StandardLibrary);
        assert_eq!(report.manifest.installable, "numpy==1.26.4\n");

        builder.set_options(FormatOptions::new(ManifestFormat::Conda));
        let report = builder.generate(&path).unwrap();
        assert_eq!(report.manifest.format, ManifestFormat::Conda);
        assert!(report.manifest.installable.ends_with("  - numpy=1.26.4\n"));
    }

    #[test]
    fn test_generate_notebook_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.ipynb");
        fs::write(
            &path,
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "outputs": [],
                           "execution_count": 1, "source": "import requests"}]}"#,
        )
        .unwrap();

        let mut builder = EnvBuilder::new(
            ResolverTables::default(),
            Box::new(InMemoryIndex::new()),
            FormatOptions::default(),
        )
        .unwrap();

        let report = builder.generate(&path).unwrap();
        assert_eq!(report.kind, SourceKind::Notebook);
        assert_eq!(report.stats.unresolved_modules, 1);
    }

    #[test]
    fn test_generate_missing_file() {
        let mut builder = EnvBuilder::new(
            ResolverTables::default(),
            Box::new(InMemoryIndex::new()),
            FormatOptions::default(),
        )
        .unwrap();

        assert!(matches!(
            builder.generate(Path::new("/missing/script.py")),
            Err(ExtractError::FileNotFound(_))
        ));
    }
}
