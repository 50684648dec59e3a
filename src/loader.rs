use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

use crate::chrom_sizes::{ChromSizes, chrom_id, manifest_url};
use crate::db::Database;
use crate::domain::{
    CancerType, ChromSize, DEFAULT_CANCER_TYPE_PARENT, Gene, GeneAlias, GeneKey, NewGene,
    ReferenceGenome,
};
use crate::error::CbioError;

/// Result of loading one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Inserted,
    Updated,
    AlreadyExists,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub inserted: usize,
    pub updated: usize,
    pub already_exists: usize,
    pub failed: usize,
}

impl LoadSummary {
    pub fn record(&mut self, outcome: &LoadOutcome) {
        match outcome {
            LoadOutcome::Inserted => self.inserted += 1,
            LoadOutcome::Updated => self.updated += 1,
            LoadOutcome::AlreadyExists => self.already_exists += 1,
            LoadOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.already_exists + self.failed
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneRecord {
    #[serde(deserialize_with = "integer_or_string")]
    pub entrez_gene_id: i64,
    pub hugo_gene_symbol: String,
    #[serde(default, rename = "type")]
    pub gene_type: Option<String>,
    #[serde(default)]
    pub cytoband: Option<String>,
    #[serde(default)]
    pub length: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneAliasRecord {
    #[serde(deserialize_with = "integer_or_string")]
    pub entrez_gene_id: i64,
    pub gene_alias: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancerTypeRecord {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
}

/// Portal exports carry Entrez ids both as JSON numbers and as strings.
fn integer_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Text(value) => value
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid integer {value:?}"))),
    }
}

/// Parses a JSON array. Elements that do not match `T` become per-record
/// failures instead of failing the file.
pub fn read_json_records<T: for<'de> Deserialize<'de>>(
    path: &Path,
) -> Result<Vec<Result<T, CbioError>>, CbioError> {
    let content = fs::read_to_string(path)
        .map_err(|err| CbioError::Filesystem(format!("read {}: {err}", path.display())))?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&content).map_err(|err| CbioError::InvalidRecord {
            source_name: path.display().to_string(),
            message: err.to_string(),
        })?;
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            serde_json::from_value(value).map_err(|err| CbioError::InvalidRecord {
                source_name: format!("{} record {}", path.display(), idx + 1),
                message: err.to_string(),
            })
        })
        .collect())
}

/// Bulk loaders over one database. Every record is its own transaction; a
/// failed record is logged and the load moves on.
pub struct Loader<'db> {
    db: &'db Database,
    dry_run: bool,
}

impl<'db> Loader<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db, dry_run: false }
    }

    /// Parse and check records without writing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn load_genes(&self, path: &Path) -> Result<LoadSummary, CbioError> {
        info!(file = %path.display(), "loading genes");
        let records = read_json_records::<GeneRecord>(path)?;
        Ok(self.run(records, |record| self.add_gene(record)))
    }

    pub fn add_gene(&self, record: GeneRecord) -> Result<LoadOutcome, CbioError> {
        let repo = self.db.repository::<Gene>();
        let key = GeneKey::new(record.entrez_gene_id, record.hugo_gene_symbol.clone());
        if repo.exists(&key)? {
            return Ok(LoadOutcome::AlreadyExists);
        }
        if !self.dry_run {
            repo.add(&NewGene {
                entrez_gene_id: record.entrez_gene_id,
                symbol: record.hugo_gene_symbol,
                gene_type: record.gene_type,
                cytoband: record.cytoband,
                length: record.length,
            })?;
        }
        Ok(LoadOutcome::Inserted)
    }

    /// Overwrites type, cytoband and length of existing genes from a TSV of
    /// `ENTREZ_GENE_ID HUGO_GENE_SYMBOL GENETIC_ENTITY_ID TYPE CYTOBAND LENGTH`.
    pub fn update_genes(&self, path: &Path) -> Result<LoadSummary, CbioError> {
        info!(file = %path.display(), "updating genes");
        let content = fs::read_to_string(path)
            .map_err(|err| CbioError::Filesystem(format!("read {}: {err}", path.display())))?;
        let records: Vec<Result<Gene, CbioError>> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.starts_with('#') && !line.trim().is_empty())
            .map(|(idx, line)| parse_gene_update(line, &format!("{}:{}", path.display(), idx + 1)))
            .collect();
        Ok(self.run(records, |update| self.update_gene(update)))
    }

    pub fn update_gene(&self, update: Gene) -> Result<LoadOutcome, CbioError> {
        let repo = self.db.repository::<Gene>();
        let mut gene = repo.get(&update.key())?;
        gene.gene_type = update.gene_type;
        gene.cytoband = update.cytoband;
        gene.length = update.length;
        if !self.dry_run {
            repo.update(&gene)?;
        }
        Ok(LoadOutcome::Updated)
    }

    pub fn load_gene_aliases(&self, path: &Path) -> Result<LoadSummary, CbioError> {
        info!(file = %path.display(), "loading gene aliases");
        let records = read_json_records::<GeneAliasRecord>(path)?;
        Ok(self.run(records, |record| {
            self.add_gene_alias(GeneAlias {
                entrez_gene_id: record.entrez_gene_id,
                alias: record.gene_alias,
            })
        }))
    }

    pub fn add_gene_alias(&self, alias: GeneAlias) -> Result<LoadOutcome, CbioError> {
        let repo = self.db.repository::<GeneAlias>();
        if repo.exists(&alias)? {
            return Ok(LoadOutcome::AlreadyExists);
        }
        if !self.dry_run {
            info!(gene = alias.entrez_gene_id, alias = %alias.alias, "adding gene alias");
            repo.add(&alias)?;
        }
        Ok(LoadOutcome::Inserted)
    }

    pub fn load_cancer_types(&self, path: &Path) -> Result<LoadSummary, CbioError> {
        info!(file = %path.display(), "loading cancer types");
        let records = read_json_records::<CancerTypeRecord>(path)?;
        Ok(self.run(records, |record| {
            self.add_cancer_type(CancerType {
                id: record.id,
                name: record.name,
                color: record.color,
                parent: Some(
                    record
                        .parent
                        .unwrap_or_else(|| DEFAULT_CANCER_TYPE_PARENT.to_string()),
                ),
                short_name: record.short_name,
                keywords: record.keywords,
            })
        }))
    }

    pub fn add_cancer_type(&self, cancer_type: CancerType) -> Result<LoadOutcome, CbioError> {
        let repo = self.db.repository::<CancerType>();
        if repo.exists(&cancer_type.id)? {
            return Ok(LoadOutcome::AlreadyExists);
        }
        if !self.dry_run {
            info!(
                id = %cancer_type.id,
                name = %cancer_type.name,
                color = %cancer_type.color,
                "adding cancer type"
            );
            repo.add(&cancer_type)?;
        }
        Ok(LoadOutcome::Inserted)
    }

    pub fn load_chrom_sizes(
        &self,
        sizes: &ChromSizes,
        reference_genome_id: i64,
    ) -> Result<LoadSummary, CbioError> {
        info!(reference_genome_id, chromosomes = sizes.len(), "loading chromosome sizes");
        let records: Vec<Result<ChromSize, CbioError>> = sizes
            .iter()
            .map(|(name, size)| {
                chrom_id(name).map(|chrom_id| ChromSize {
                    reference_genome_id,
                    chrom_id,
                    chrom_name: name.clone(),
                    size: *size,
                })
            })
            .collect();
        Ok(self.run(records, |chrom| self.add_chrom_size(chrom)))
    }

    pub fn add_chrom_size(&self, chrom: ChromSize) -> Result<LoadOutcome, CbioError> {
        let repo = self.db.repository::<ChromSize>();
        if repo.exists(&chrom.key())? {
            return Ok(LoadOutcome::AlreadyExists);
        }
        if !self.dry_run {
            repo.add(&chrom)?;
        }
        Ok(LoadOutcome::Inserted)
    }

    /// Inserts the reference-genome row of `build` unless it exists. The
    /// genome size is the sum of the primary chromosome sizes.
    pub fn load_reference_genome(
        &self,
        reference_genome_id: i64,
        species: &str,
        build: &str,
        build_name: &str,
        sizes: &ChromSizes,
        base_url: &str,
    ) -> Result<LoadOutcome, CbioError> {
        let repo = self.db.repository::<ReferenceGenome>();
        if repo.exists(&reference_genome_id)? {
            return Ok(LoadOutcome::AlreadyExists);
        }
        if !self.dry_run {
            info!(reference_genome_id, build, "adding reference genome");
            repo.add(&ReferenceGenome {
                reference_genome_id,
                species: Some(species.to_string()),
                name: Some(build.to_string()),
                build_name: Some(build_name.to_string()),
                genome_size: Some(sizes.values().sum()),
                url: Some(manifest_url(base_url, build)),
                release_date: Some(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            })?;
        }
        Ok(LoadOutcome::Inserted)
    }

    fn run<T, F>(&self, records: Vec<Result<T, CbioError>>, mut load: F) -> LoadSummary
    where
        F: FnMut(T) -> Result<LoadOutcome, CbioError>,
    {
        let mut summary = LoadSummary::default();
        for record in records {
            let outcome = match record.and_then(&mut load) {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("{err}");
                    LoadOutcome::Failed(err.to_string())
                }
            };
            summary.record(&outcome);
        }
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            already_exists = summary.already_exists,
            failed = summary.failed,
            "load finished"
        );
        summary
    }
}

fn parse_gene_update(line: &str, location: &str) -> Result<Gene, CbioError> {
    let invalid = |message: String| CbioError::InvalidRecord {
        source_name: location.to_string(),
        message,
    };
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    let [entrez, symbol, entity, gene_type, cytoband, length] = fields.as_slice() else {
        return Err(invalid(format!("expected 6 columns, found {}", fields.len())));
    };
    let optional = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };
    Ok(Gene {
        entrez_gene_id: entrez
            .trim()
            .parse()
            .map_err(|_| invalid(format!("invalid ENTREZ_GENE_ID {entrez:?}")))?,
        symbol: symbol.trim().to_string(),
        genetic_entity_id: entity.trim().parse().unwrap_or_default(),
        gene_type: optional(*gene_type),
        cytoband: optional(*cytoband),
        length: optional(*length)
            .map(|value| value.parse::<i64>())
            .transpose()
            .map_err(|_| invalid(format!("invalid LENGTH {length:?}")))?,
    })
}
