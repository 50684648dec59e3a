use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, warn};

use crate::config::ReferenceGenomeConfig;
use crate::error::CbioError;

pub const DEFAULT_PORTAL_URL: &str = "http://localhost/cbioportal";

/// Where the validator gets portal metadata from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalSource {
    Url(String),
    InfoDir(PathBuf),
    NoChecks,
}

impl Default for PortalSource {
    fn default() -> Self {
        Self::Url(DEFAULT_PORTAL_URL.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub study_dir: PathBuf,
    pub portal: PortalSource,
    pub verbose: bool,
    pub override_warnings: bool,
    pub reference_genome: Option<ReferenceGenomeConfig>,
    pub html_table: Option<PathBuf>,
    pub portal_properties: Option<PathBuf>,
}

impl ImportRequest {
    pub fn new(study_dir: impl Into<PathBuf>) -> Self {
        Self {
            study_dir: study_dir.into(),
            portal: PortalSource::default(),
            verbose: false,
            override_warnings: false,
            reference_genome: None,
            html_table: None,
            portal_properties: None,
        }
    }
}

/// Validator result, classified from its exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Passed,
    Errors,
    Warnings,
    Failed(i32),
}

impl Validation {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Passed,
            1 => Self::Errors,
            3 => Self::Warnings,
            other => Self::Failed(other),
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Errors => 1,
            Self::Warnings => 3,
            Self::Failed(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Import { overridden: bool },
    Halt { exit_code: i32 },
}

pub fn decide(validation: Validation, override_warnings: bool) -> Decision {
    match validation {
        Validation::Passed => Decision::Import { overridden: false },
        Validation::Warnings if override_warnings => Decision::Import { overridden: true },
        other => Decision::Halt {
            exit_code: other.exit_code(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Validating,
    AwaitingOverride,
    Importing,
    Done(i32),
}

/// External validator and importer for a study directory.
pub trait StudyTool {
    /// Runs validation and returns the validator's exit code.
    fn validate(&self, request: &ImportRequest) -> Result<i32, CbioError>;

    fn import(&self, request: &ImportRequest) -> Result<(), CbioError>;
}

/// Validates a study and imports it when the validator allows, returning the
/// process exit code.
pub fn run_meta_import(tool: &dyn StudyTool, request: &ImportRequest) -> Result<i32, CbioError> {
    let mut phase = ImportPhase::Validating;
    let mut validation = Validation::Passed;
    loop {
        phase = match phase {
            ImportPhase::Validating => {
                info!(study = %request.study_dir.display(), "starting validation");
                let code = tool.validate(request).inspect_err(|err| match err {
                    CbioError::Interrupted(_) => warn_interrupted(),
                    _ => error!(error = %err, "error occurred during validation step"),
                })?;
                validation = Validation::from_exit_code(code);
                match validation {
                    Validation::Passed => {
                        info!("everything looks good, importing study now");
                        ImportPhase::Importing
                    }
                    Validation::Warnings => ImportPhase::AwaitingOverride,
                    Validation::Errors => {
                        error!("one or more errors reported above, please fix your files accordingly");
                        ImportPhase::Done(validation.exit_code())
                    }
                    Validation::Failed(code) => {
                        error!(code, "validator exited unexpectedly");
                        ImportPhase::Done(code)
                    }
                }
            }
            ImportPhase::AwaitingOverride => match decide(validation, request.override_warnings) {
                Decision::Import { .. } => {
                    warn!("overriding warnings, importing study now");
                    ImportPhase::Importing
                }
                Decision::Halt { exit_code } => {
                    warn!("warnings reported, fix your files or import with the override warning option");
                    ImportPhase::Done(exit_code)
                }
            },
            ImportPhase::Importing => {
                if let Err(err) = tool.import(request) {
                    match &err {
                        CbioError::Interrupted(_) => warn_interrupted(),
                        _ => error!(
                            error = %err,
                            "error occurred during data loading step, fix the problem and run this again to make sure the study is completely loaded"
                        ),
                    }
                    return Err(err);
                }
                info!(study = %request.study_dir.display(), "study imported");
                ImportPhase::Done(0)
            }
            ImportPhase::Done(code) => return Ok(code),
        };
    }
}

fn warn_interrupted() {
    warn!("process interrupted, run this again to make sure the study is completely loaded");
}

/// Installs the Ctrl-C handler and returns the flag it raises. The child
/// process receives the same signal from the terminal.
pub fn install_interrupt_handler() -> Result<Arc<AtomicBool>, CbioError> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|err| CbioError::StudyTool(format!("failed to install interrupt handler: {err}")))?;
    Ok(interrupted)
}

/// Runs the portal's scripts JAR as a child process.
#[derive(Debug, Clone)]
pub struct JarStudyTool {
    java: PathBuf,
    jar: PathBuf,
    interrupted: Arc<AtomicBool>,
}

impl JarStudyTool {
    pub fn new(jar: impl Into<PathBuf>) -> Self {
        Self {
            java: PathBuf::from("java"),
            jar: jar.into(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares the flag set by [`install_interrupt_handler`].
    pub fn with_interrupt_flag(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
        self.java = java.into();
        self
    }

    pub fn jar(&self) -> &Path {
        &self.jar
    }

    fn run_cmd(&self, args: &[String], step: &'static str) -> Result<ExitStatus, CbioError> {
        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar").arg(&self.jar).args(args);
        let status = cmd.status().map_err(|err| {
            CbioError::StudyTool(format!("failed to start {}: {err}", self.java.display()))
        })?;
        if status.code().is_none() || self.interrupted.load(Ordering::SeqCst) {
            return Err(CbioError::Interrupted(step));
        }
        Ok(status)
    }
}

impl StudyTool for JarStudyTool {
    fn validate(&self, request: &ImportRequest) -> Result<i32, CbioError> {
        let status = self.run_cmd(&validate_args(request), "validation")?;
        status
            .code()
            .ok_or(CbioError::Interrupted("validation"))
    }

    fn import(&self, request: &ImportRequest) -> Result<(), CbioError> {
        let status = self.run_cmd(&import_args(request), "import")?;
        if status.success() {
            return Ok(());
        }
        Err(CbioError::StudyTool(format!(
            "import of {} exited with {status}",
            request.study_dir.display()
        )))
    }
}

fn validate_args(request: &ImportRequest) -> Vec<String> {
    let mut args = vec![
        "validate".to_string(),
        "--study_directory".to_string(),
        request.study_dir.to_string_lossy().to_string(),
    ];
    match &request.portal {
        PortalSource::Url(url) => {
            args.push("--url_server".to_string());
            args.push(url.clone());
        }
        PortalSource::InfoDir(dir) => {
            args.push("--portal_info_dir".to_string());
            args.push(dir.to_string_lossy().to_string());
        }
        PortalSource::NoChecks => args.push("--no_portal_checks".to_string()),
    }
    if let Some(genome) = &request.reference_genome {
        args.extend([
            "--species".to_string(),
            genome.species.clone(),
            "--genome_build".to_string(),
            genome.ucsc_build.clone(),
            "--ncbi_build".to_string(),
            genome.ncbi_build.clone(),
        ]);
    }
    if let Some(properties) = &request.portal_properties {
        args.push("--portal_properties".to_string());
        args.push(properties.to_string_lossy().to_string());
    }
    if let Some(html) = &request.html_table {
        args.push("--html_table".to_string());
        args.push(html.to_string_lossy().to_string());
    }
    if request.verbose {
        args.push("--verbose".to_string());
    }
    args
}

fn import_args(request: &ImportRequest) -> Vec<String> {
    vec![
        "import".to_string(),
        "--study_directory".to_string(),
        request.study_dir.to_string_lossy().to_string(),
    ]
}
