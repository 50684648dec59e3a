use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::CbioError;

pub const UCSC_BASE_URL: &str = "http://hgdownload.cse.ucsc.edu/goldenPath";
const CHROM_PREFIX: &str = "chr";
const CHROM_X_ID: i64 = 23;
const CHROM_Y_ID: i64 = 24;

static HAPLOTYPE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_hap[0-9]+$").expect("valid haplotype regex"));

/// Chromosome name (without `chr`) to length in bases.
pub type ChromSizes = BTreeMap<String, i64>;

pub trait ChromSizeSource {
    /// Returns the manifest URL and its body.
    fn fetch_manifest(&self, build: &str) -> Result<(String, String), CbioError>;
}

#[derive(Clone)]
pub struct UcscClient {
    client: Client,
    base_url: String,
}

impl UcscClient {
    pub fn new() -> Result<Self, CbioError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cbio-importer/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CbioError::ChromSizeHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| CbioError::ChromSizeHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: UCSC_BASE_URL.to_string(),
        })
    }
}

impl ChromSizeSource for UcscClient {
    fn fetch_manifest(&self, build: &str) -> Result<(String, String), CbioError> {
        let url = manifest_url(&self.base_url, build);
        debug!(%url, "retrieving chromosome lengths");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| CbioError::ChromSizeHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "chromosome size request failed".to_string());
            return Err(CbioError::ChromSizeStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| CbioError::ChromSizeHttp(err.to_string()))?;
        Ok((url, body))
    }
}

pub fn manifest_url(base_url: &str, build: &str) -> String {
    format!("{base_url}/{build}/bigZips/{build}.chrom.sizes")
}

/// Fetches and filters the chromosome sizes of `build`.
pub fn load_chromosome_lengths(
    source: &dyn ChromSizeSource,
    build: &str,
) -> Result<ChromSizes, CbioError> {
    let (url, body) = source.fetch_manifest(build)?;
    parse_chrom_sizes(&body, &url)
}

/// Keeps the primary assembly chromosomes of a UCSC chrom.sizes manifest.
///
/// Unplaced and random contigs, alternative haplotypes and the
/// mitochondrial chromosome are dropped. Any line that is not a
/// `chr<name>\t<size>` pair fails the whole parse.
pub fn parse_chrom_sizes(text: &str, url: &str) -> Result<ChromSizes, CbioError> {
    let malformed = |line: &str| CbioError::MalformedManifest {
        url: url.to_string(),
        line: line.to_string(),
    };

    let mut sizes = ChromSizes::new();
    for line in text.lines() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, size)) = line.split_once('\t') else {
            return Err(malformed(line));
        };
        if size.contains('\t') || !name.starts_with(CHROM_PREFIX) {
            return Err(malformed(line));
        }
        if name.ends_with("_random") || name.starts_with("chrUn_") {
            continue;
        }
        if HAPLOTYPE_SUFFIX.is_match(name) || name == "chrM" {
            continue;
        }
        let chrom = &name[CHROM_PREFIX.len()..];
        if chrom.len() > 2 {
            continue;
        }
        let size = size.trim().parse::<i64>().map_err(|_| malformed(line))?;
        sizes.insert(chrom.to_string(), size);
    }
    Ok(sizes)
}

/// Numeric chromosome id used by the portal: autosomes keep their number,
/// `X` is 23 and `Y` is 24.
pub fn chrom_id(name: &str) -> Result<i64, CbioError> {
    match name {
        "X" => Ok(CHROM_X_ID),
        "Y" => Ok(CHROM_Y_ID),
        other => other
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| CbioError::InvalidChromosome(other.to_string())),
    }
}

/// Portal id of a reference genome build.
pub fn reference_genome_id(build: &str) -> i64 {
    match build {
        "hg38" => 2,
        "mm10" => 3,
        _ => 1,
    }
}
