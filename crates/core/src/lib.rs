//! EnvBuilder Core Library
//!
//! This library scans a single Python source file or Jupyter notebook for its
//! imports, resolves each imported module to an installed distribution and
//! version, and renders a dependency manifest.
//!
//! # Features
//!
//! - Parse Python imports (import, from...import) with tree-sitter
//! - Read code cells from `.ipynb` notebooks, skipping cells that do not parse
//! - Detect sibling `.py` files as local modules
//! - Map import names to distribution names (`PIL` -> `Pillow`)
//! - Classify modules as standard library, local file, installed or missing
//! - Render pip (`requirements.txt`) or conda (`environment.yml`) manifests
//! - Save manifests and provision virtual environments from them
//!
//! # Example
//!
//! ```no_run
//! use envbuilder_core::{EnvBuilder, FormatOptions, ResolverTables, SitePackagesIndex};
//! use std::path::Path;
//!
//! let index = SitePackagesIndex::from_interpreter(Path::new("python3")).unwrap();
//! let mut builder = EnvBuilder::new(
//!     ResolverTables::default(),
//!     Box::new(index),
//!     FormatOptions::default(),
//! )
//! .unwrap();
//!
//! let report = builder.generate(Path::new("analysis.py")).unwrap();
//! print!("{}", report.manifest.display_text());
//! ```

pub mod builder;
pub mod config;
pub mod extractor;
pub mod index;
pub mod models;
pub mod output;
pub mod parsers;
pub mod provision;
pub mod resolver;
pub mod save;

// Re-exports for convenience
pub use builder::EnvBuilder;
pub use config::{ConfigError, EnvBuilderConfig, ResolverTables};
pub use extractor::{ExtractError, ImportExtractor};
pub use index::{IndexError, InMemoryIndex, PackageIndex, SitePackagesIndex};
pub use models::*;
pub use output::{format_output, render_manifest, FormatError, FormatOptions, OutputFormat};
pub use provision::{
    provision, spawn, ProvisionError, ProvisionHandle, ProvisionReport, ProvisionRequest,
    ProvisionStage,
};
pub use resolver::VersionResolver;
pub use save::{save_manifest, SaveError};
