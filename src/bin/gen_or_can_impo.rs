use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use miette::IntoDiagnostic;
use tracing::info;

use cbio_importer::config::ConfigLoader;
use cbio_importer::db::Database;
use cbio_importer::error::CbioError;
use cbio_importer::loader::Loader;
use cbio_importer::logging;
use cbio_importer::output::JsonOutput;

#[derive(Parser)]
#[command(name = "gen_or_can_impo")]
#[command(about = "Load genes, gene aliases or cancer types into the portal database")]
#[command(version)]
#[command(group(
    ArgGroup::new("table")
        .required(true)
        .args(["gene", "cancer_type", "gene_alias", "update_gene"])
))]
struct Cli {
    #[arg(long, env = "CBIO_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short = 'g', long, help = "Import genes from a JSON file")]
    gene: bool,

    #[arg(short = 'c', long, help = "Import cancer types from a JSON file")]
    cancer_type: bool,

    #[arg(short = 'a', long, help = "Import gene aliases from a JSON file")]
    gene_alias: bool,

    #[arg(short = 'u', long, help = "Update genes from a tab-separated file")]
    update_gene: bool,

    #[arg(short = 'f', long, help = "Path to the gene, gene alias or cancer type file")]
    file: PathBuf,

    #[arg(short = 't', long, visible_alias = "test", help = "Parse and check only, write nothing")]
    dry_run: bool,

    #[arg(long, help = "Print the load summary as JSON")]
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
    let file = cli.file.as_path();

    let summary = if cli.gene {
        info!(file = %file.display(), "gene file");
        loader.load_genes(file)?
    } else if cli.cancer_type {
        info!(file = %file.display(), "cancer type file");
        loader.load_cancer_types(file)?
    } else if cli.gene_alias {
        info!(file = %file.display(), "gene alias file");
        loader.load_gene_aliases(file)?
    } else {
        info!(file = %file.display(), "gene update file");
        loader.update_genes(file)?
    };

    if cli.json {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    }
    Ok(())
}
