use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use tracing::info;

use cbio_importer::config::ConfigLoader;
use cbio_importer::error::CbioError;
use cbio_importer::logging;
use cbio_importer::pipeline::{
    ImportRequest, JarStudyTool, PortalSource, install_interrupt_handler, run_meta_import,
};

#[derive(Parser)]
#[command(name = "cbio_impo")]
#[command(about = "Validate a study directory and import it into the portal")]
#[command(version)]
#[command(group(
    ArgGroup::new("portal").args(["url_server", "portal_info_dir", "no_portal_checks"])
))]
struct Cli {
    #[arg(long, env = "CBIO_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short = 's', long, help = "Path to the study directory")]
    study_directory: PathBuf,

    #[arg(short = 'u', long, help = "URL of the portal web application (default: http://localhost/cbioportal)")]
    url_server: Option<String>,

    #[arg(short = 'p', long, help = "Directory with portal information exported by the portal")]
    portal_info_dir: Option<PathBuf>,

    #[arg(short = 'n', long, help = "Skip checks that need the running portal")]
    no_portal_checks: bool,

    #[arg(short = 'P', long, help = "portal.properties file passed on to the validator")]
    portal_properties: Option<PathBuf>,

    #[arg(short = 'g', long, help = "Pass the configured reference genome to the validator")]
    reference_genome: bool,

    #[arg(long, visible_alias = "html", help = "Write the validation report as an HTML table")]
    html_table: Option<PathBuf>,

    #[arg(long, visible_alias = "jar", help = "Path to the portal scripts JAR")]
    jar_path: Option<PathBuf>,

    #[arg(short = 'v', long, help = "Report status info messages while validating")]
    verbose: bool,

    #[arg(short = 'o', long, help = "Override warnings and continue importing")]
    override_warning: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<CbioError>() {
                return ExitCode::from(err.exit_code());
            }
            ExitCode::from(1)
        }
    }
}

fn run() -> miette::Result<u8> {
    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    logging::init(config.importer.log_file.as_deref())?;

    if !cli.study_directory.is_dir() {
        return Err(CbioError::Filesystem(format!(
            "study directory does not exist: {}",
            cli.study_directory.display()
        ))
        .into());
    }
    let jar = cli
        .jar_path
        .or(config.java_file.jar_path)
        .ok_or_else(|| {
            CbioError::StudyTool("no scripts JAR given (pass --jar-path or set java_file.jar_path)".to_string())
        })?;
    info!(jar = %jar.display(), "using scripts JAR");

    let portal = match (cli.url_server, cli.portal_info_dir, cli.no_portal_checks) {
        (Some(url), _, _) => PortalSource::Url(url),
        (None, Some(dir), _) => PortalSource::InfoDir(dir),
        (None, None, true) => PortalSource::NoChecks,
        (None, None, false) => PortalSource::default(),
    };
    let request = ImportRequest {
        study_dir: cli.study_directory,
        portal,
        verbose: cli.verbose,
        override_warnings: cli.override_warning,
        reference_genome: cli.reference_genome.then(|| config.reference_genome.clone()),
        html_table: cli.html_table,
        portal_properties: cli.portal_properties,
    };

    let interrupted = install_interrupt_handler()?;
    let tool = JarStudyTool::new(jar).with_interrupt_flag(interrupted);
    let code = run_meta_import(&tool, &request)?;
    Ok(u8::try_from(code).unwrap_or(1))
}
