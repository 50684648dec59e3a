use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;

use cbio_importer::config::ConfigLoader;
use cbio_importer::error::CbioError;
use cbio_importer::layout::{DEFAULT_SAMPLE_DATA_FILE, DEFAULT_SEGMENT_DATA_FILE, StudyLayout};
use cbio_importer::logging;
use cbio_importer::output::JsonOutput;
use cbio_importer::study::{
    DEFAULT_CASE_LIST_NAME, DEFAULT_SEGMENT_EXTENSION, SegmentStudyParams, write_segment_study,
};

#[derive(Parser)]
#[command(name = "cna_seq_impo")]
#[command(about = "Generate copy-number segment meta and data files for a study directory")]
#[command(version)]
struct Cli {
    #[arg(long, env = "CBIO_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short = 'i', long, help = "Identifier of the cancer study")]
    study_identifier: String,

    #[arg(short = 's', long, help = "Path to the study directory")]
    study_directory: PathBuf,

    #[arg(long, visible_alias = "desc", help = "Description of the segment data")]
    description: String,

    #[arg(short = 'g', long, help = "Reference genome build (default: configured UCSC build)")]
    reference_genome_id: Option<String>,

    #[arg(short = 'e', long, default_value = DEFAULT_SEGMENT_EXTENSION, help = "Extension of the input segment files")]
    file_extension: String,

    #[arg(short = 'f', long, default_value = DEFAULT_SEGMENT_DATA_FILE, help = "Merged segment data file")]
    seg_data_filename: String,

    #[arg(long, visible_alias = "sf", default_value = DEFAULT_SAMPLE_DATA_FILE, help = "Sample data file")]
    sample_data_filename: String,

    #[arg(short = 'c', long, help = "Create the all-samples case list")]
    create_case_lists: bool,

    #[arg(long, visible_alias = "cn", default_value = DEFAULT_CASE_LIST_NAME, help = "Case list name")]
    case_list_name: String,

    #[arg(long, help = "Print the generation report as JSON")]
    json: bool,
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
    let reference_genome_id = cli
        .reference_genome_id
        .unwrap_or_else(|| config.reference_genome.ucsc_build.clone());

    let mut params =
        SegmentStudyParams::new(cli.study_identifier, cli.description, reference_genome_id);
    params.file_extension = cli.file_extension;
    params.segment_data_file = cli.seg_data_filename;
    params.sample_data_file = cli.sample_data_filename;
    params.create_case_lists = cli.create_case_lists;
    params.case_list_name = cli.case_list_name;

    let report = write_segment_study(&layout, &params)?;
    info!(
        inputs = report.input_files.len(),
        segments = report.segment_rows,
        samples = report.samples.len(),
        "segment study written"
    );
    if cli.json {
        JsonOutput::print_segment_report(&report).into_diagnostic()?;
    }
    Ok(())
}
