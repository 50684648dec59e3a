use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CbioError;

/// Parent assigned to cancer types loaded without one.
pub const DEFAULT_CANCER_TYPE_PARENT: &str = "tissue";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancerType {
    pub id: String,
    pub name: String,
    pub color: String,
    pub parent: Option<String>,
    pub short_name: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Gene,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Gene => "GENE",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CbioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GENE" => Ok(EntityType::Gene),
            other => Err(CbioError::Database(format!("unknown entity type {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneticEntity {
    pub id: i64,
    pub entity_type: EntityType,
}

/// Lookup key of a gene: the Entrez id together with its HUGO symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GeneKey {
    pub entrez_gene_id: i64,
    pub symbol: String,
}

impl GeneKey {
    pub fn new(entrez_gene_id: i64, symbol: impl Into<String>) -> Self {
        Self {
            entrez_gene_id,
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for GeneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.entrez_gene_id, self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gene {
    pub entrez_gene_id: i64,
    pub symbol: String,
    pub genetic_entity_id: i64,
    pub gene_type: Option<String>,
    pub cytoband: Option<String>,
    pub length: Option<i64>,
}

impl Gene {
    pub fn key(&self) -> GeneKey {
        GeneKey::new(self.entrez_gene_id, self.symbol.clone())
    }
}

/// A gene that has not been stored yet; its genetic entity is allocated on
/// insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGene {
    pub entrez_gene_id: i64,
    pub symbol: String,
    pub gene_type: Option<String>,
    pub cytoband: Option<String>,
    pub length: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GeneAlias {
    pub entrez_gene_id: i64,
    pub alias: String,
}

impl fmt::Display for GeneAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entrez_gene_id, self.alias)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceGenome {
    pub reference_genome_id: i64,
    pub species: Option<String>,
    pub name: Option<String>,
    pub build_name: Option<String>,
    pub genome_size: Option<i64>,
    pub url: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChromKey {
    pub reference_genome_id: i64,
    pub chrom_id: i64,
}

impl fmt::Display for ChromKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.reference_genome_id, self.chrom_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChromSize {
    pub reference_genome_id: i64,
    pub chrom_id: i64,
    pub chrom_name: String,
    pub size: i64,
}

impl ChromSize {
    pub fn key(&self) -> ChromKey {
        ChromKey {
            reference_genome_id: self.reference_genome_id,
            chrom_id: self.chrom_id,
        }
    }
}
