use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use miette::IntoDiagnostic;
use tracing::info;

use cbio_importer::chrom_sizes::{
    UCSC_BASE_URL, UcscClient, load_chromosome_lengths, reference_genome_id,
};
use cbio_importer::config::ConfigLoader;
use cbio_importer::db::Database;
use cbio_importer::error::CbioError;
use cbio_importer::loader::Loader;
use cbio_importer::logging;
use cbio_importer::output::JsonOutput;

#[derive(Parser)]
#[command(name = "ref_genome_impo")]
#[command(about = "Load a reference genome and its chromosome sizes from UCSC")]
#[command(version)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .multiple(true)
        .args(["ref_genome", "chrom_size", "read_chrom_size"])
))]
struct Cli {
    #[arg(long, env = "CBIO_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short = 'g', long, help = "Load the reference genome row")]
    ref_genome: bool,

    #[arg(short = 'c', long, help = "Load chromosome sizes")]
    chrom_size: bool,

    #[arg(short = 'n', long, help = "Reference genome build name, e.g. hg38")]
    genome_name: String,

    #[arg(short = 'r', long, help = "Read stored chromosome sizes instead of loading them")]
    read_chrom_size: bool,

    #[arg(short = 't', long, visible_alias = "test", help = "Fetch and check only, write nothing")]
    dry_run: bool,

    #[arg(long, help = "Print summaries and stored sizes as JSON")]
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

    let db = Database::open(&config.cbioportal_db)?;
    let loader = Loader::new(&db).dry_run(cli.dry_run);
    let build = cli.genome_name.as_str();
    let ref_id = reference_genome_id(build);
    let load_chroms = cli.chrom_size && !cli.read_chrom_size;

    if cli.ref_genome || load_chroms {
        let client = UcscClient::new()?;
        info!(build, "loading chromosome sizes for reference genome");
        let sizes = load_chromosome_lengths(&client, build)?;

        if cli.ref_genome {
            let genome = &config.reference_genome;
            let build_name = if build == genome.ucsc_build {
                genome.ncbi_build.as_str()
            } else {
                build
            };
            let outcome = loader.load_reference_genome(
                ref_id,
                &genome.species,
                build,
                build_name,
                &sizes,
                UCSC_BASE_URL,
            )?;
            info!(reference_genome_id = ref_id, ?outcome, "reference genome");
        }

        if load_chroms {
            let summary = loader.load_chrom_sizes(&sizes, ref_id)?;
            if cli.json {
                JsonOutput::print_summary(&summary).into_diagnostic()?;
            }
        }
    }

    if cli.read_chrom_size {
        info!(build, "retrieving chromosome sizes for reference genome");
        let stored = db.chrom_sizes(ref_id)?;
        for chrom in &stored {
            info!(chrom = %chrom.chrom_name, size = chrom.size, "chromosome size");
        }
        if cli.json {
            JsonOutput::print_chrom_sizes(&stored).into_diagnostic()?;
        }
    }
    Ok(())
}
