use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use cbio_importer::config::ConfigLoader;
use cbio_importer::error::CbioError;
use cbio_importer::layout::StudyLayout;
use cbio_importer::logging;
use cbio_importer::study::{MetaStudyParams, write_meta_study};

#[derive(Parser)]
#[command(name = "meta_study_impo")]
#[command(about = "Generate meta_study.txt for a study directory")]
#[command(version)]
struct Cli {
    #[arg(long, env = "CBIO_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short = 'i', long, help = "Identifier of the cancer study")]
    study_identifier: String,

    #[arg(short = 's', long, help = "Path to the study directory")]
    study_directory: PathBuf,

    #[arg(short = 't', long, help = "Type of cancer")]
    type_of_cancer: String,

    #[arg(short = 'n', long, help = "Name of the cancer study")]
    name: String,

    #[arg(long, visible_alias = "desc", help = "Description of the cancer study")]
    description: String,

    #[arg(short = 'c', long, help = "Cancer study citation")]
    citation: Option<String>,

    #[arg(short = 'p', long, help = "Cancer study PubMed id")]
    pmid: Option<String>,

    #[arg(short = 'g', long, help = "Cancer study groups")]
    group: Option<String>,

    #[arg(long, visible_alias = "sn", help = "Short name of the cancer study")]
    short_name: Option<String>,

    #[arg(short = 'a', long, help = "Add the global case list")]
    add_global_case_list: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<CbioError>() {
            return ExitCode::from(err.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    logging::init(config.importer.log_file.as_deref())?;

    let layout = StudyLayout::new(&cli.study_directory)?;
    let params = MetaStudyParams {
        study_id: cli.study_identifier,
        type_of_cancer: cli.type_of_cancer,
        name: cli.name,
        description: cli.description,
        citation: cli.citation,
        pmid: cli.pmid,
        groups: cli.group,
        short_name: cli.short_name,
        add_global_case_list: cli.add_global_case_list,
    };
    let path = write_meta_study(&layout, &params)?;
    info!(path = %path.display(), "meta study written");
    Ok(())
}
