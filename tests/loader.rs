use std::fs;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;

use cbio_importer::chrom_sizes::{ChromSizeSource, load_chromosome_lengths};
use cbio_importer::db::Database;
use cbio_importer::domain::{CancerType, Gene, GeneKey, ReferenceGenome};
use cbio_importer::error::CbioError;
use cbio_importer::loader::{LoadOutcome, LoadSummary, Loader};

const GENES: &str = r#"[
  {"entrez_gene_id": 7157, "hugo_gene_symbol": "TP53", "type": "protein-coding", "cytoband": "17p13.1", "length": 19149},
  {"entrez_gene_id": "672", "hugo_gene_symbol": "BRCA1"}
]"#;

struct Fixture {
    temp: tempfile::TempDir,
    db: Database,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let db = Database::at(temp.path().join("portal.db"));
        db.ensure_schema().unwrap();
        Self { temp, db }
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

struct StaticManifest(&'static str);

impl ChromSizeSource for StaticManifest {
    fn fetch_manifest(&self, build: &str) -> Result<(String, String), CbioError> {
        Ok((format!("mock://{build}.chrom.sizes"), self.0.to_string()))
    }
}

fn summary(inserted: usize, updated: usize, already_exists: usize, failed: usize) -> LoadSummary {
    LoadSummary {
        inserted,
        updated,
        already_exists,
        failed,
    }
}

#[test]
fn gene_load_is_idempotent() {
    let fixture = Fixture::new();
    let path = fixture.file("genes.json", GENES);
    let loader = Loader::new(&fixture.db);

    assert_eq!(loader.load_genes(&path).unwrap(), summary(2, 0, 0, 0));
    assert_eq!(loader.load_genes(&path).unwrap(), summary(0, 0, 2, 0));

    let brca1 = fixture
        .db
        .repository::<Gene>()
        .get(&GeneKey::new(672, "BRCA1"))
        .unwrap();
    assert_eq!(brca1.gene_type, None);
}

#[test]
fn invalid_records_do_not_stop_the_load() {
    let fixture = Fixture::new();
    let path = fixture.file(
        "genes.json",
        r#"[
          {"entrez_gene_id": "not-a-number", "hugo_gene_symbol": "BAD"},
          {"entrez_gene_id": 7157, "hugo_gene_symbol": "TP53"},
          {"entrez_gene_id": 7157, "hugo_gene_symbol": "P53"}
        ]"#,
    );

    let summary = Loader::new(&fixture.db).load_genes(&path).unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.total(), 3);
}

#[test]
fn dry_run_writes_nothing() {
    let fixture = Fixture::new();
    let path = fixture.file("genes.json", GENES);

    let summary = Loader::new(&fixture.db)
        .dry_run(true)
        .load_genes(&path)
        .unwrap();
    assert_eq!(summary.inserted, 2);
    assert!(
        !fixture
            .db
            .repository::<Gene>()
            .exists(&GeneKey::new(7157, "TP53"))
            .unwrap()
    );
}

#[test]
fn update_overwrites_gene_attributes() {
    let fixture = Fixture::new();
    let loader = Loader::new(&fixture.db);
    loader
        .load_genes(&fixture.file("genes.json", GENES))
        .unwrap();

    let updates = fixture.file(
        "genes.tsv",
        "#ENTREZ_GENE_ID\tHUGO_GENE_SYMBOL\tGENETIC_ENTITY_ID\tTYPE\tCYTOBAND\tLENGTH\n\
         672\tBRCA1\t2\tprotein-coding\t17q21.31\t81189\n\
         999\tMISSING\t3\tprotein-coding\t1p1\t10\n",
    );
    assert_eq!(loader.update_genes(&updates).unwrap(), summary(0, 1, 0, 1));

    let brca1 = fixture
        .db
        .repository::<Gene>()
        .get(&GeneKey::new(672, "BRCA1"))
        .unwrap();
    assert_eq!(brca1.cytoband.as_deref(), Some("17q21.31"));
    assert_eq!(brca1.length, Some(81189));
}

#[test]
fn aliases_need_their_gene() {
    let fixture = Fixture::new();
    let loader = Loader::new(&fixture.db);
    loader
        .load_genes(&fixture.file("genes.json", GENES))
        .unwrap();

    let aliases = fixture.file(
        "aliases.json",
        r#"[
          {"entrez_gene_id": 7157, "gene_alias": "LFS1"},
          {"entrez_gene_id": "7157", "gene_alias": "LFS1"},
          {"entrez_gene_id": 1, "gene_alias": "ORPHAN"}
        ]"#,
    );
    assert_eq!(loader.load_gene_aliases(&aliases).unwrap(), summary(1, 0, 1, 1));
}

#[test]
fn cancer_type_parent_defaults_to_tissue() {
    let fixture = Fixture::new();
    let path = fixture.file(
        "cancer_types.json",
        r#"[
          {"id": "brca", "name": "Breast Invasive Carcinoma", "color": "HotPink", "parent": "breast"},
          {"id": "breast", "name": "Breast", "color": "HotPink"}
        ]"#,
    );
    let loader = Loader::new(&fixture.db);
    assert_eq!(loader.load_cancer_types(&path).unwrap(), summary(2, 0, 0, 0));

    let repo = fixture.db.repository::<CancerType>();
    assert_eq!(repo.get(&"breast".to_string()).unwrap().parent.as_deref(), Some("tissue"));
    assert_eq!(repo.get(&"brca".to_string()).unwrap().parent.as_deref(), Some("breast"));
}

#[test]
fn file_that_is_not_an_array_fails_as_a_whole() {
    let fixture = Fixture::new();
    let path = fixture.file("genes.json", r#"{"entrez_gene_id": 1}"#);
    assert_matches!(
        Loader::new(&fixture.db).load_genes(&path),
        Err(CbioError::InvalidRecord { .. })
    );
    assert_matches!(
        Loader::new(&fixture.db).load_genes(Path::new("/nonexistent/genes.json")),
        Err(CbioError::Filesystem(_))
    );
}

#[test]
fn reference_genome_and_chromosomes_from_manifest() {
    let fixture = Fixture::new();
    let source = StaticManifest("chr7\t159138663\nchrX\t155270560\nchrY\t59373566\nchrM\t16571\n");
    let sizes = load_chromosome_lengths(&source, "hg19").unwrap();
    let loader = Loader::new(&fixture.db);

    let outcome = loader
        .load_reference_genome(1, "human", "hg19", "GRCh37", &sizes, "http://example.org")
        .unwrap();
    assert_eq!(outcome, LoadOutcome::Inserted);
    assert_eq!(
        loader
            .load_reference_genome(1, "human", "hg19", "GRCh37", &sizes, "http://example.org")
            .unwrap(),
        LoadOutcome::AlreadyExists
    );

    let genome = fixture.db.repository::<ReferenceGenome>().get(&1).unwrap();
    assert_eq!(genome.genome_size, Some(159138663 + 155270560 + 59373566));
    assert_eq!(
        genome.url.as_deref(),
        Some("http://example.org/hg19/bigZips/hg19.chrom.sizes")
    );
    assert!(genome.release_date.is_some());

    assert_eq!(loader.load_chrom_sizes(&sizes, 1).unwrap(), summary(3, 0, 0, 0));
    let ids: Vec<i64> = fixture
        .db
        .chrom_sizes(1)
        .unwrap()
        .iter()
        .map(|chrom| chrom.chrom_id)
        .collect();
    assert_eq!(ids, vec![7, 23, 24]);
}
