mod logging;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use envbuilder_core::{
    format_output, provision, save_manifest, EnvBuilder, EnvBuilderConfig, ManifestFormat,
    OutputFormat, ProvisionRequest, ProvisionStage, SitePackagesIndex,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "envbuilder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate pip/conda dependency manifests from a Python file or Jupyter notebook")]
#[command(long_about = "Scans a single .py or .ipynb file for import statements, resolves each \
    imported module to an installed package and version, and prints a requirements.txt \
    (pip) or environment.yml (conda) style manifest. Optionally saves the manifest and \
    creates a virtual environment from it.\n\n\
    Versions are looked up in the environment of the selected Python interpreter, which \
    may differ from the one the scanned file was written for.")]
pub struct Args {
    /// Python (.py) or notebook (.ipynb) file to scan
    pub path: PathBuf,

    /// Manifest format
    #[arg(short, long, value_enum)]
    pub format: Option<ManifestFormatArg>,

    /// Leave classification comments out of the displayed manifest
    #[arg(long)]
    pub no_comments: bool,

    /// What to print to stdout
    #[arg(short, long, value_enum, default_value_t = ReportArg::Text)]
    pub report: ReportArg,

    /// Save the installable manifest (.txt for pip, .yml for conda)
    #[arg(short, long)]
    pub save: Option<PathBuf>,

    /// Create an environment and install the manifest into it
    #[arg(long)]
    pub create_env: bool,

    /// Name of the environment to create
    #[arg(long)]
    pub venv_name: Option<String>,

    /// Environment name written into the conda manifest
    #[arg(long)]
    pub env_name: Option<String>,

    /// Python interpreter used for version lookup and venv creation
    #[arg(long)]
    pub python: Option<PathBuf>,

    /// Config file (defaults to ./envbuilder.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show verbose progress
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ManifestFormatArg {
    Pip,
    Conda,
}

impl From<ManifestFormatArg> for ManifestFormat {
    fn from(arg: ManifestFormatArg) -> Self {
        match arg {
            ManifestFormatArg::Pip => ManifestFormat::Pip,
            ManifestFormatArg::Conda => ManifestFormat::Conda,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ReportArg {
    Text,
    Json,
    Yaml,
}

impl From<ReportArg> for OutputFormat {
    fn from(arg: ReportArg) -> Self {
        match arg {
            ReportArg::Text => OutputFormat::Text,
            ReportArg::Json => OutputFormat::Json,
            ReportArg::Yaml => OutputFormat::Yaml,
        }
    }
}

/// Config file values with command-line overrides applied
fn load_config(args: &Args) -> anyhow::Result<EnvBuilderConfig> {
    let mut config = match &args.config {
        Some(path) => EnvBuilderConfig::load(path)?,
        None => EnvBuilderConfig::discover(&std::env::current_dir()?)?,
    };

    if let Some(format) = args.format {
        config.format = format.into();
    }
    if args.no_comments {
        config.include_comments = false;
    }
    if let Some(name) = &args.env_name {
        config.env_name = name.clone();
    }
    if let Some(name) = &args.venv_name {
        config.venv_name = name.clone();
    }
    if let Some(python) = &args.python {
        config.python = Some(python.clone());
    }

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let filter = if args.verbose {
        Some("debug")
    } else {
        config.log_filter.as_deref()
    };
    logging::init_logging(filter);

    let python = config.python_or_default();
    // Without an interpreter nothing resolves, but the scan still runs
    let index = SitePackagesIndex::from_interpreter(&python).unwrap_or_else(|e| {
        warn!(error = %e, "Package versions unavailable");
        SitePackagesIndex::default()
    });

    let mut builder = EnvBuilder::new(
        config.resolver_tables(),
        Box::new(index),
        config.format_options(),
    )?;
    let report = builder.generate(&args.path)?;

    print!("{}", format_output(&report, args.report.into())?);

    if let Some(path) = &args.save {
        let path = config.save_path(path);
        save_manifest(&report.manifest, &path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        eprintln!("Environment file saved to {}", path.display());
    }

    if args.create_env {
        let request = ProvisionRequest::new(config.venv_name.clone(), &report.manifest)
            .with_python(python)
            .with_work_dir(std::env::current_dir()?);

        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30}] {pos}% {msg}")?
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(100));

        let result = provision(&request, |stage| {
            pb.set_position(u64::from(stage.percent()));
            pb.set_message(match stage {
                ProvisionStage::Creating => "creating environment",
                ProvisionStage::Installing => "installing dependencies",
                ProvisionStage::Finished => "done",
            });
        });
        pb.finish_and_clear();

        let outcome = result?;
        eprintln!("{}", outcome.text());
        if !outcome.success {
            bail!("Provisioning of '{}' failed", config.venv_name);
        }
        info!(env = %config.venv_name, "Environment ready");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "envbuilder",
            "notebook.ipynb",
            "--format",
            "conda",
            "--no-comments",
            "--report",
            "json",
            "--save",
            "environment.yml",
            "--create-env",
            "--venv-name",
            "science",
        ])
        .unwrap();

        assert_eq!(args.path, PathBuf::from("notebook.ipynb"));
        assert_eq!(
            args.format.map(ManifestFormat::from),
            Some(ManifestFormat::Conda)
        );
        assert!(args.no_comments);
        assert_eq!(OutputFormat::from(args.report), OutputFormat::Json);
        assert_eq!(args.save, Some(PathBuf::from("environment.yml")));
        assert!(args.create_env);
        assert_eq!(args.venv_name.as_deref(), Some("science"));
    }

    #[test]
    fn test_path_required() {
        assert!(Args::try_parse_from(["envbuilder"]).is_err());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let args = Args::try_parse_from([
            "envbuilder",
            "main.py",
            "--config",
            "/nonexistent/envbuilder.toml",
        ])
        .unwrap();

        assert!(load_config(&args).is_err());
    }
}
