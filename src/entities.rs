//! Table mappings of the portal records.

use crate::db::{Entity, Insertable, Session, SqlError, SqlRow, SqlValue, Updatable, sql_params};
use crate::domain::{
    CancerType, ChromKey, ChromSize, EntityType, Gene, GeneAlias, GeneKey, GeneticEntity, NewGene,
    ReferenceGenome,
};
use crate::error::CbioError;

impl Entity for CancerType {
    type Key = String;

    const KIND: &'static str = "cancer type";
    const TABLE: &'static str = "type_of_cancer";
    const COLUMNS: &'static [&'static str] = &[
        "TYPE_OF_CANCER_ID",
        "NAME",
        "DEDICATED_COLOR",
        "PARENT",
        "SHORT_NAME",
        "CLINICAL_TRIAL_KEYWORDS",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["TYPE_OF_CANCER_ID"];

    fn key_values(key: &Self::Key) -> Vec<SqlValue> {
        sql_params![key.as_str()]
    }

    fn from_row(row: &SqlRow) -> Result<Self, SqlError> {
        Ok(CancerType {
            id: row.get(0)?,
            name: row.get(1)?,
            color: row.get(2)?,
            parent: row.get(3)?,
            short_name: row.get(4)?,
            keywords: row.get(5)?,
        })
    }

    fn error(key: &Self::Key, message: String) -> CbioError {
        CbioError::CancerType {
            message,
            id: key.clone(),
        }
    }
}

impl Insertable for CancerType {
    type Draft = CancerType;

    fn insert(session: &mut dyn Session, draft: &Self::Draft) -> Result<Self::Key, SqlError> {
        session.execute(
            "INSERT INTO type_of_cancer (
               TYPE_OF_CANCER_ID, NAME, DEDICATED_COLOR, PARENT, SHORT_NAME, CLINICAL_TRIAL_KEYWORDS
             ) VALUES (?, ?, ?, ?, ?, ?)",
            &sql_params![
                draft.id.as_str(),
                draft.name.as_str(),
                draft.color.as_str(),
                draft.parent.as_deref(),
                draft.short_name.as_deref().unwrap_or(""),
                draft.keywords.as_deref().unwrap_or(""),
            ],
        )?;
        Ok(draft.id.clone())
    }

    fn draft_error(draft: &Self::Draft, message: String) -> CbioError {
        Self::error(&draft.id, message)
    }
}

impl Entity for GeneticEntity {
    type Key = i64;

    const KIND: &'static str = "genetic entity";
    const TABLE: &'static str = "genetic_entity";
    const COLUMNS: &'static [&'static str] = &["ID", "ENTITY_TYPE"];
    const KEY_COLUMNS: &'static [&'static str] = &["ID"];

    fn key_values(key: &Self::Key) -> Vec<SqlValue> {
        sql_params![*key]
    }

    fn from_row(row: &SqlRow) -> Result<Self, SqlError> {
        let tag: String = row.get(1)?;
        let entity_type = tag
            .parse::<EntityType>()
            .map_err(|err| SqlError(format!("column 1: {err}")))?;
        Ok(GeneticEntity {
            id: row.get(0)?,
            entity_type,
        })
    }

    fn error(key: &Self::Key, message: String) -> CbioError {
        CbioError::Database(format!("genetic entity {key}: {message}"))
    }
}

impl Insertable for GeneticEntity {
    type Draft = EntityType;

    fn insert(session: &mut dyn Session, draft: &Self::Draft) -> Result<Self::Key, SqlError> {
        session.execute(
            "INSERT INTO genetic_entity (ENTITY_TYPE) VALUES (?)",
            &sql_params![draft.as_str()],
        )?;
        Ok(session.last_insert_id())
    }

    fn draft_error(draft: &Self::Draft, message: String) -> CbioError {
        CbioError::Database(format!("genetic entity of type {draft}: {message}"))
    }
}

impl Entity for Gene {
    type Key = GeneKey;

    const KIND: &'static str = "gene";
    const TABLE: &'static str = "gene";
    const COLUMNS: &'static [&'static str] = &[
        "ENTREZ_GENE_ID",
        "HUGO_GENE_SYMBOL",
        "GENETIC_ENTITY_ID",
        "TYPE",
        "CYTOBAND",
        "LENGTH",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["ENTREZ_GENE_ID", "HUGO_GENE_SYMBOL"];

    fn key_values(key: &Self::Key) -> Vec<SqlValue> {
        sql_params![key.entrez_gene_id, key.symbol.as_str()]
    }

    fn from_row(row: &SqlRow) -> Result<Self, SqlError> {
        Ok(Gene {
            entrez_gene_id: row.get(0)?,
            symbol: row.get(1)?,
            genetic_entity_id: row.get(2)?,
            gene_type: row.get(3)?,
            cytoband: row.get(4)?,
            length: row.get(5)?,
        })
    }

    fn error(key: &Self::Key, message: String) -> CbioError {
        CbioError::Gene {
            message,
            entrez_gene_id: key.entrez_gene_id,
            symbol: key.symbol.clone(),
        }
    }
}

impl Insertable for Gene {
    type Draft = NewGene;

    /// Allocates the gene's genetic entity in the same transaction, so a
    /// rejected gene leaves no orphan entity behind.
    fn insert(session: &mut dyn Session, draft: &Self::Draft) -> Result<Self::Key, SqlError> {
        let genetic_entity_id = GeneticEntity::insert(session, &EntityType::Gene)?;
        session.execute(
            "INSERT INTO gene (
               ENTREZ_GENE_ID, HUGO_GENE_SYMBOL, GENETIC_ENTITY_ID, TYPE, CYTOBAND, LENGTH
             ) VALUES (?, ?, ?, ?, ?, ?)",
            &sql_params![
                draft.entrez_gene_id,
                draft.symbol.as_str(),
                genetic_entity_id,
                draft.gene_type.as_deref(),
                draft.cytoband.as_deref(),
                draft.length,
            ],
        )?;
        Ok(GeneKey::new(draft.entrez_gene_id, draft.symbol.clone()))
    }

    fn draft_error(draft: &Self::Draft, message: String) -> CbioError {
        CbioError::Gene {
            message,
            entrez_gene_id: draft.entrez_gene_id,
            symbol: draft.symbol.clone(),
        }
    }
}

impl Updatable for Gene {
    fn key(&self) -> Self::Key {
        Gene::key(self)
    }

    fn update(session: &mut dyn Session, record: &Self) -> Result<u64, SqlError> {
        session.execute(
            "UPDATE gene SET TYPE = ?, CYTOBAND = ?, LENGTH = ?
             WHERE ENTREZ_GENE_ID = ? AND HUGO_GENE_SYMBOL = ?",
            &sql_params![
                record.gene_type.as_deref(),
                record.cytoband.as_deref(),
                record.length,
                record.entrez_gene_id,
                record.symbol.as_str(),
            ],
        )
    }
}

impl Entity for GeneAlias {
    type Key = GeneAlias;

    const KIND: &'static str = "gene alias";
    const TABLE: &'static str = "gene_alias";
    const COLUMNS: &'static [&'static str] = &["ENTREZ_GENE_ID", "GENE_ALIAS"];
    const KEY_COLUMNS: &'static [&'static str] = &["ENTREZ_GENE_ID", "GENE_ALIAS"];

    fn key_values(key: &Self::Key) -> Vec<SqlValue> {
        sql_params![key.entrez_gene_id, key.alias.as_str()]
    }

    fn from_row(row: &SqlRow) -> Result<Self, SqlError> {
        Ok(GeneAlias {
            entrez_gene_id: row.get(0)?,
            alias: row.get(1)?,
        })
    }

    fn error(key: &Self::Key, message: String) -> CbioError {
        CbioError::GeneAlias {
            message,
            entrez_gene_id: key.entrez_gene_id,
            alias: key.alias.clone(),
        }
    }
}

impl Insertable for GeneAlias {
    type Draft = GeneAlias;

    fn insert(session: &mut dyn Session, draft: &Self::Draft) -> Result<Self::Key, SqlError> {
        session.execute(
            "INSERT INTO gene_alias (ENTREZ_GENE_ID, GENE_ALIAS) VALUES (?, ?)",
            &sql_params![draft.entrez_gene_id, draft.alias.as_str()],
        )?;
        Ok(draft.clone())
    }

    fn draft_error(draft: &Self::Draft, message: String) -> CbioError {
        Self::error(draft, message)
    }
}

impl Entity for ReferenceGenome {
    type Key = i64;

    const KIND: &'static str = "reference genome";
    const TABLE: &'static str = "reference_genome";
    const COLUMNS: &'static [&'static str] = &[
        "reference_genome_id",
        "species",
        "name",
        "build_name",
        "genome_size",
        "URL",
        "release_date",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["reference_genome_id"];

    fn key_values(key: &Self::Key) -> Vec<SqlValue> {
        sql_params![*key]
    }

    fn from_row(row: &SqlRow) -> Result<Self, SqlError> {
        Ok(ReferenceGenome {
            reference_genome_id: row.get(0)?,
            species: row.get(1)?,
            name: row.get(2)?,
            build_name: row.get(3)?,
            genome_size: row.get(4)?,
            url: row.get(5)?,
            release_date: row.get(6)?,
        })
    }

    fn error(key: &Self::Key, message: String) -> CbioError {
        CbioError::ReferenceGenome {
            message,
            reference_genome_id: *key,
        }
    }
}

impl Insertable for ReferenceGenome {
    type Draft = ReferenceGenome;

    fn insert(session: &mut dyn Session, draft: &Self::Draft) -> Result<Self::Key, SqlError> {
        session.execute(
            "INSERT INTO reference_genome (
               reference_genome_id, species, name, build_name, genome_size, URL, release_date, current
             ) VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
            &sql_params![
                draft.reference_genome_id,
                draft.species.as_deref(),
                draft.name.as_deref(),
                draft.build_name.as_deref(),
                draft.genome_size,
                draft.url.as_deref(),
                draft.release_date.as_deref(),
            ],
        )?;
        Ok(draft.reference_genome_id)
    }

    fn draft_error(draft: &Self::Draft, message: String) -> CbioError {
        Self::error(&draft.reference_genome_id, message)
    }
}

impl Entity for ChromSize {
    type Key = ChromKey;

    const KIND: &'static str = "chromosome size";
    const TABLE: &'static str = "chrom_size";
    const COLUMNS: &'static [&'static str] =
        &["reference_genome_id", "chrom_id", "chrom_name", "size"];
    const KEY_COLUMNS: &'static [&'static str] = &["reference_genome_id", "chrom_id"];

    fn key_values(key: &Self::Key) -> Vec<SqlValue> {
        sql_params![key.reference_genome_id, key.chrom_id]
    }

    fn from_row(row: &SqlRow) -> Result<Self, SqlError> {
        Ok(ChromSize {
            reference_genome_id: row.get(0)?,
            chrom_id: row.get(1)?,
            chrom_name: row.get::<Option<String>>(2)?.unwrap_or_default(),
            size: row.get::<Option<i64>>(3)?.unwrap_or_default(),
        })
    }

    fn error(key: &Self::Key, message: String) -> CbioError {
        CbioError::ChromSize {
            message,
            reference_genome_id: key.reference_genome_id,
            chrom_id: key.chrom_id,
        }
    }
}

impl Insertable for ChromSize {
    type Draft = ChromSize;

    fn insert(session: &mut dyn Session, draft: &Self::Draft) -> Result<Self::Key, SqlError> {
        session.execute(
            "INSERT INTO chrom_size (reference_genome_id, chrom_id, chrom_name, size)
             VALUES (?, ?, ?, ?)",
            &sql_params![
                draft.reference_genome_id,
                draft.chrom_id,
                draft.chrom_name.as_str(),
                draft.size,
            ],
        )?;
        Ok(draft.key())
    }

    fn draft_error(draft: &Self::Draft, message: String) -> CbioError {
        Self::error(&draft.key(), message)
    }
}
