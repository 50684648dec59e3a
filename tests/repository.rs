use assert_matches::assert_matches;

use cbio_importer::db::Database;
use cbio_importer::domain::{
    CancerType, ChromKey, ChromSize, EntityType, Gene, GeneAlias, GeneKey, NewGene,
    ReferenceGenome,
};
use cbio_importer::error::CbioError;

fn database() -> (tempfile::TempDir, Database) {
    let temp = tempfile::tempdir().unwrap();
    let db = Database::at(temp.path().join("portal.db"));
    db.ensure_schema().unwrap();
    (temp, db)
}

fn tp53() -> NewGene {
    NewGene {
        entrez_gene_id: 7157,
        symbol: "TP53".to_string(),
        gene_type: Some("protein-coding".to_string()),
        cytoband: Some("17p13.1".to_string()),
        length: Some(19149),
    }
}

#[test]
fn gene_insert_creates_genetic_entity() {
    let (_temp, db) = database();
    let repo = db.repository::<Gene>();
    let key = GeneKey::new(7157, "TP53");

    assert!(!repo.exists(&key).unwrap());
    assert_eq!(repo.add(&tp53()).unwrap(), key);
    assert!(repo.exists(&key).unwrap());

    let gene = repo.get(&key).unwrap();
    assert_eq!(gene.symbol, "TP53");
    assert_eq!(gene.cytoband.as_deref(), Some("17p13.1"));

    let entity = db
        .repository::<cbio_importer::domain::GeneticEntity>()
        .get(&gene.genetic_entity_id)
        .unwrap();
    assert_eq!(entity.entity_type, EntityType::Gene);
}

#[test]
fn gene_with_taken_entrez_id_is_rejected() {
    let (_temp, db) = database();
    let repo = db.repository::<Gene>();
    repo.add(&tp53()).unwrap();

    let mut clash = tp53();
    clash.symbol = "P53".to_string();
    assert_matches!(
        repo.add(&clash),
        Err(CbioError::Gene { entrez_gene_id: 7157, symbol, .. }) if symbol == "P53"
    );
}

#[test]
fn missing_record_is_not_found() {
    let (_temp, db) = database();
    assert_matches!(
        db.repository::<CancerType>().get(&"brca".to_string()),
        Err(CbioError::RecordNotFound { kind: "cancer type", .. })
    );
}

#[test]
fn update_of_missing_gene_is_not_found() {
    let (_temp, db) = database();
    let gene = Gene {
        entrez_gene_id: 1,
        symbol: "A1BG".to_string(),
        genetic_entity_id: 1,
        gene_type: None,
        cytoband: None,
        length: None,
    };
    assert_matches!(
        db.repository::<Gene>().update(&gene),
        Err(CbioError::RecordNotFound { .. })
    );
}

#[test]
fn alias_requires_existing_gene() {
    let (_temp, db) = database();
    let alias = GeneAlias {
        entrez_gene_id: 7157,
        alias: "LFS1".to_string(),
    };
    assert_matches!(
        db.repository::<GeneAlias>().add(&alias),
        Err(CbioError::GeneAlias { entrez_gene_id: 7157, .. })
    );

    db.repository::<Gene>().add(&tp53()).unwrap();
    db.repository::<GeneAlias>().add(&alias).unwrap();
    assert!(db.repository::<GeneAlias>().exists(&alias).unwrap());
}

#[test]
fn chrom_sizes_are_listed_by_genome() {
    let (_temp, db) = database();
    db.repository::<ReferenceGenome>()
        .add(&ReferenceGenome {
            reference_genome_id: 1,
            species: Some("human".to_string()),
            name: Some("hg19".to_string()),
            build_name: Some("GRCh37".to_string()),
            genome_size: Some(300),
            url: None,
            release_date: None,
        })
        .unwrap();
    let chroms = db.repository::<ChromSize>();
    for (chrom_id, name, size) in [(23, "X", 100), (1, "1", 200)] {
        chroms
            .add(&ChromSize {
                reference_genome_id: 1,
                chrom_id,
                chrom_name: name.to_string(),
                size,
            })
            .unwrap();
    }

    assert!(
        chroms
            .exists(&ChromKey {
                reference_genome_id: 1,
                chrom_id: 23
            })
            .unwrap()
    );
    let stored = db.chrom_sizes(1).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(db.chrom_sizes(2).unwrap().is_empty());
}
