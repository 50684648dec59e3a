use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CbioError {
    #[error("no configuration file found (set CBIO_CONFIG or pass --config)")]
    #[diagnostic(help("expected an INI file with [cbioportal_db], [reference_genome], [java_file] and [importer] sections"))]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse config file: {0}")]
    ConfigParse(String),

    #[error("gene {entrez_gene_id} ({symbol}): {message}")]
    Gene {
        message: String,
        entrez_gene_id: i64,
        symbol: String,
    },

    #[error("gene alias {alias} of gene {entrez_gene_id}: {message}")]
    GeneAlias {
        message: String,
        entrez_gene_id: i64,
        alias: String,
    },

    #[error("cancer type {id}: {message}")]
    CancerType { message: String, id: String },

    #[error("reference genome {reference_genome_id}: {message}")]
    ReferenceGenome {
        message: String,
        reference_genome_id: i64,
    },

    #[error("chromosome {chrom_id} of reference genome {reference_genome_id}: {message}")]
    ChromSize {
        message: String,
        reference_genome_id: i64,
        chrom_id: i64,
    },

    #[error("no {kind} record found for {key}")]
    RecordNotFound { kind: &'static str, key: String },

    #[error("multiple {kind} records found for {key}")]
    DuplicateRecords { kind: &'static str, key: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid record in {source_name}: {message}")]
    InvalidRecord {
        source_name: String,
        message: String,
    },

    #[error("invalid chromosome name: {0}")]
    InvalidChromosome(String),

    #[error("sample identifier {0:?} is not of the form PATIENT_SUFFIX")]
    InvalidSampleId(String),

    #[error("{path}:{line}: expected 6 tab-separated columns")]
    MalformedSegmentLine { path: PathBuf, line: usize },

    #[error("template has no value for placeholder ${0}")]
    MissingPlaceholder(String),

    #[error("invalid placeholder in template at byte {0}")]
    InvalidPlaceholder(usize),

    #[error("chromosome size request failed: {0}")]
    ChromSizeHttp(String),

    #[error("chromosome size server returned status {status}: {message}")]
    ChromSizeStatus { status: u16, message: String },

    #[error("unexpected response from {url}: {line:?}")]
    MalformedManifest { url: String, line: String },

    #[error("directory already exists: {0}")]
    DirectoryExists(PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("study tool failed: {0}")]
    StudyTool(String),

    #[error("process interrupted during {0}")]
    Interrupted(&'static str),
}

impl CbioError {
    /// Process exit code reported by the command-line tools.
    pub fn exit_code(&self) -> u8 {
        match self {
            CbioError::MissingConfig | CbioError::ConfigRead(_) | CbioError::ConfigParse(_) => 2,
            CbioError::ChromSizeHttp(_)
            | CbioError::ChromSizeStatus { .. }
            | CbioError::MalformedManifest { .. } => 3,
            CbioError::Interrupted(_) => 130,
            _ => 1,
        }
    }
}
