//! Environment provisioning
//!
//! Creates an isolated environment and installs a generated manifest into it
//! by driving external tools (`python -m venv` + `pip`, or `conda`). Failures
//! of those tools end up in the [`ProvisionReport`]; only unmet preconditions
//! are returned as errors.

use crate::config::default_python;
use crate::models::{Manifest, ManifestFormat};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Nothing to install: generate the environment file first")]
    NoContent,
    #[error("Please enter a name for the virtual environment")]
    NoEnvironmentName,
    #[error("Failed to write temporary manifest: {0}")]
    TempFileError(#[from] std::io::Error),
}

/// Progress milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStage {
    Creating,
    Installing,
    Finished,
}

impl ProvisionStage {
    pub fn percent(&self) -> u8 {
        match self {
            ProvisionStage::Creating => 10,
            ProvisionStage::Installing => 60,
            ProvisionStage::Finished => 100,
        }
    }
}

/// What to provision and with which tools
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub env_name: String,
    /// Installable manifest text
    pub installable: String,
    pub format: ManifestFormat,
    /// Interpreter that runs `-m venv`
    pub python: PathBuf,
    /// Directory the venv is created in
    pub work_dir: PathBuf,
}

impl ProvisionRequest {
    pub fn new(env_name: impl Into<String>, manifest: &Manifest) -> Self {
        Self {
            env_name: env_name.into(),
            installable: manifest.installable.clone(),
            format: manifest.format,
            python: default_python(),
            work_dir: PathBuf::from("."),
        }
    }

    pub fn with_python(mut self, python: PathBuf) -> Self {
        self.python = python;
        self
    }

    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        if self.installable.is_empty() {
            return Err(ProvisionError::NoContent);
        }
        if self.env_name.trim().is_empty() {
            return Err(ProvisionError::NoEnvironmentName);
        }
        Ok(())
    }

    fn env_dir(&self) -> PathBuf {
        self.work_dir.join(&self.env_name)
    }

    fn pip_path(&self) -> PathBuf {
        if cfg!(windows) {
            self.env_dir().join("Scripts").join("pip.exe")
        } else {
            self.env_dir().join("bin").join("pip")
        }
    }

    fn create_command(&self) -> Command {
        match self.format {
            ManifestFormat::Pip => {
                let mut cmd = Command::new(&self.python);
                cmd.arg("-m").arg("venv").arg(self.env_dir());
                cmd
            }
            ManifestFormat::Conda => {
                let mut cmd = Command::new("conda");
                cmd.args(["create", "-y", "-n", &self.env_name]);
                cmd
            }
        }
    }

    fn install_command(&self, manifest_path: &Path) -> Command {
        match self.format {
            ManifestFormat::Pip => {
                let mut cmd = Command::new(self.pip_path());
                cmd.arg("install").arg("-r").arg(manifest_path);
                cmd
            }
            ManifestFormat::Conda => {
                let mut cmd = Command::new("conda");
                cmd.args(["env", "update", "-n", &self.env_name, "-f"])
                    .arg(manifest_path);
                cmd
            }
        }
    }

    fn activation_hint(&self) -> String {
        let name = &self.env_name;
        match self.format {
            ManifestFormat::Pip => format!(
                "Activate with: {name}\\Scripts\\activate (Windows) or source {name}/bin/activate (Unix/Linux/Mac)"
            ),
            ManifestFormat::Conda => format!("Activate with: conda activate {name}"),
        }
    }
}

/// Outcome of a provisioning run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub success: bool,
    /// Messages in the order they were produced
    pub output: Vec<String>,
    /// Where the temporary manifest was written; removed by the time the report exists
    pub manifest_path: PathBuf,
}

impl ProvisionReport {
    pub fn text(&self) -> String {
        self.output.join("\n")
    }
}

/// Create the environment and install the manifest into it, blocking until done.
///
/// The temporary manifest is removed before this returns, whatever the outcome.
pub fn provision<F>(request: &ProvisionRequest, mut on_stage: F) -> Result<ProvisionReport, ProvisionError>
where
    F: FnMut(ProvisionStage),
{
    request.validate()?;

    let mut file = tempfile::Builder::new()
        .prefix("envbuilder-")
        .suffix(&format!(".{}", request.format.extension()))
        .tempfile()?;
    file.write_all(request.installable.as_bytes())?;
    file.flush()?;
    let manifest_path = file.into_temp_path();

    let mut report = ProvisionReport {
        success: false,
        output: Vec::new(),
        manifest_path: manifest_path.to_path_buf(),
    };

    on_stage(ProvisionStage::Creating);
    report.output.push(format!(
        "Creating virtual environment '{}'... (This may take a bit)",
        request.env_name
    ));
    info!(env = %request.env_name, format = %request.format, "Creating environment");

    if run_step(&mut request.create_command(), "Error creating virtual environment", &mut report) {
        on_stage(ProvisionStage::Installing);
        report.output.push("Installing dependencies...".to_string());

        if run_step(
            &mut request.install_command(&manifest_path),
            "Error installing dependencies",
            &mut report,
        ) {
            report.success = true;
            report
                .output
                .push("Virtual environment created successfully!".to_string());
            report.output.push(request.activation_hint());
        }
    }

    if let Err(e) = manifest_path.close() {
        warn!(error = %e, "Failed to remove temporary manifest");
    }
    on_stage(ProvisionStage::Finished);

    Ok(report)
}

/// Run one external command, recording any failure in the report
fn run_step(command: &mut Command, context: &str, report: &mut ProvisionReport) -> bool {
    match command.output() {
        Ok(Output { status, .. }) if status.success() => true,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "{context}");
            report.output.push(format!("{context}:\n{}", stderr.trim_end()));
            false
        }
        Err(e) => {
            warn!(error = %e, "{context}");
            report.output.push(format!("{context}: {e}"));
            false
        }
    }
}

/// Provisioning running on a background thread
pub struct ProvisionHandle {
    handle: JoinHandle<Result<ProvisionReport, ProvisionError>>,
    progress: Arc<AtomicU8>,
}

impl ProvisionHandle {
    /// Last reached percentage
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for completion
    pub fn join(self) -> Result<ProvisionReport, ProvisionError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Ok(ProvisionReport {
                success: false,
                output: vec!["Provisioning thread panicked".to_string()],
                manifest_path: PathBuf::new(),
            }),
        }
    }
}

/// Start provisioning on a new thread.
///
/// Preconditions are checked before the thread starts.
pub fn spawn(request: ProvisionRequest) -> Result<ProvisionHandle, ProvisionError> {
    request.validate()?;

    let progress = Arc::new(AtomicU8::new(0));
    let thread_progress = Arc::clone(&progress);
    let handle = thread::spawn(move || {
        provision(&request, |stage| {
            thread_progress.store(stage.percent(), Ordering::Relaxed)
        })
    });

    Ok(ProvisionHandle { handle, progress })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pip_manifest() -> Manifest {
        Manifest {
            format: ManifestFormat::Pip,
            lines: vec!["requests==2.31.0".to_string()],
            installable: "requests==2.31.0\n".to_string(),
        }
    }

    #[test]
    fn test_preconditions() {
        let empty = ProvisionRequest::new("venv", &Manifest::default());
        assert!(matches!(
            provision(&empty, |_| {}),
            Err(ProvisionError::NoContent)
        ));

        let unnamed = ProvisionRequest::new("  ", &pip_manifest());
        assert!(matches!(
            provision(&unnamed, |_| {}),
            Err(ProvisionError::NoEnvironmentName)
        ));
        assert!(matches!(
            spawn(unnamed),
            Err(ProvisionError::NoEnvironmentName)
        ));
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_pip_commands() {
        let request = ProvisionRequest::new("venv", &pip_manifest())
            .with_python(PathBuf::from("python3"))
            .with_work_dir(PathBuf::from("/work"));

        let create = request.create_command();
        assert_eq!(create.get_program(), "python3");
        assert_eq!(
            args(&create),
            vec!["-m".to_string(), "venv".to_string(), "/work/venv".to_string()]
        );

        let install = request.install_command(Path::new("/tmp/deps.txt"));
        assert_eq!(install.get_program(), request.pip_path().as_os_str());
        assert_eq!(args(&install), vec!["install", "-r", "/tmp/deps.txt"]);
        assert!(request.activation_hint().contains("venv/bin/activate"));
    }

    #[test]
    fn test_conda_commands() {
        let manifest = Manifest {
            format: ManifestFormat::Conda,
            lines: vec!["  - numpy=1.26.4".to_string()],
            installable: "name: env\nchannels:\n  - conda-forge\ndependencies:\n  - numpy=1.26.4\n"
                .to_string(),
        };
        let request = ProvisionRequest::new("analysis", &manifest);
        assert_eq!(request.format.extension(), "yml");

        let create = request.create_command();
        assert_eq!(create.get_program(), "conda");
        assert_eq!(args(&create), vec!["create", "-y", "-n", "analysis"]);

        let install = request.install_command(Path::new("/tmp/envbuilder-x.yml"));
        assert_eq!(install.get_program(), "conda");
        assert_eq!(
            args(&install),
            vec!["env", "update", "-n", "analysis", "-f", "/tmp/envbuilder-x.yml"]
        );
        assert_eq!(
            request.activation_hint(),
            "Activate with: conda activate analysis"
        );
    }

    #[test]
    fn test_spawn_reports_full_progress() {
        let dir = tempfile::tempdir().unwrap();
        let request = ProvisionRequest::new("venv", &pip_manifest())
            .with_python(PathBuf::from("/no/such/python"))
            .with_work_dir(dir.path().to_path_buf());

        let handle = spawn(request).unwrap();
        while !handle.is_finished() {
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(handle.progress(), 100);

        let report = handle.join().unwrap();
        assert!(!report.success);
    }

    #[test]
    fn test_failed_creation_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let request = ProvisionRequest::new("venv", &pip_manifest())
            .with_python(PathBuf::from("/no/such/python"))
            .with_work_dir(dir.path().to_path_buf());

        let mut stages = Vec::new();
        let report = provision(&request, |stage| stages.push(stage)).unwrap();

        assert!(!report.success);
        assert!(report.text().contains("Error creating virtual environment"));
        assert!(!report.manifest_path.exists());
        assert_eq!(
            stages,
            vec![ProvisionStage::Creating, ProvisionStage::Finished]
        );
    }

    #[cfg(unix)]
    fn fake_pip(dir: &Path, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("venv").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let pip = bin.join("pip");
        std::fs::write(&pip, script).unwrap();
        std::fs::set_permissions(&pip, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run_removes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        // Succeeds only when called as `pip install -r <existing file>`
        fake_pip(
            dir.path(),
            "#!/bin/sh\ntest \"$1\" = install && test \"$2\" = -r && test -f \"$3\"\n",
        );
        let request = ProvisionRequest::new("venv", &pip_manifest())
            .with_python(PathBuf::from("true"))
            .with_work_dir(dir.path().to_path_buf());

        let mut stages = Vec::new();
        let report = provision(&request, |stage| stages.push(stage)).unwrap();

        assert!(report.success, "{}", report.text());
        assert!(report.text().contains("created successfully"));
        assert!(report.text().contains("source venv/bin/activate"));
        assert!(report.manifest_path.to_string_lossy().ends_with(".txt"));
        assert!(!report.manifest_path.exists());
        assert_eq!(
            stages,
            vec![
                ProvisionStage::Creating,
                ProvisionStage::Installing,
                ProvisionStage::Finished
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_install_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        fake_pip(dir.path(), "#!/bin/sh\necho 'No matching distribution' >&2\nexit 1\n");
        let request = ProvisionRequest::new("venv", &pip_manifest())
            .with_python(PathBuf::from("true"))
            .with_work_dir(dir.path().to_path_buf());

        let handle = spawn(request).unwrap();
        let report = handle.join().unwrap();

        assert!(!report.success);
        assert!(report.text().contains("Error installing dependencies"));
        assert!(report.text().contains("No matching distribution"));
        assert!(!report.manifest_path.exists());
    }
}
