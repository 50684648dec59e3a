use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::CbioError;
use crate::fs_util;
use crate::layout::{DEFAULT_SAMPLE_DATA_FILE, DEFAULT_SEGMENT_DATA_FILE, StudyLayout};
use crate::template::MetaTemplate;

pub const DEFAULT_SEGMENT_EXTENSION: &str = "seg";
pub const DEFAULT_CASE_LIST_NAME: &str = "All Tumors";

const SEGMENT_HEADER: &str = "ID\tchrom\tloc.start\tloc.end\tnum.mark\tseg.mean";
const SEGMENT_COLUMNS: usize = 6;
const SAMPLE_HEADER: [&str; 5] = [
    "#Patient Identifier\tSample Identifier\tSubtype",
    "#Patient identifier\tSample identifier\tSubtype description",
    "#STRING\tSTRING\tSTRING",
    "#1\t1\t1",
    "PATIENT_ID\tSAMPLE_ID\tSUBTYPE",
];

#[derive(Debug, Clone)]
pub struct MetaStudyParams {
    pub study_id: String,
    pub type_of_cancer: String,
    pub name: String,
    pub description: String,
    pub citation: Option<String>,
    pub pmid: Option<String>,
    pub groups: Option<String>,
    pub short_name: Option<String>,
    pub add_global_case_list: bool,
}

/// Renders `meta_study.txt`.
pub fn render_meta_study(params: &MetaStudyParams) -> Result<String, CbioError> {
    let values = BTreeMap::from([
        ("type_of_cancer", params.type_of_cancer.clone()),
        ("cancer_study_identifier", params.study_id.clone()),
        ("name", params.name.clone()),
        ("description", params.description.clone()),
        ("citation", params.citation.clone().unwrap_or_default()),
        ("pmid", params.pmid.clone().unwrap_or_default()),
        ("groups", params.groups.clone().unwrap_or_default()),
        ("short_name", params.short_name.clone().unwrap_or_default()),
        (
            "add_global_case_list",
            params.add_global_case_list.to_string(),
        ),
    ]);
    MetaTemplate::MetaStudy.template().substitute(&values)
}

pub fn write_meta_study(layout: &StudyLayout, params: &MetaStudyParams) -> Result<PathBuf, CbioError> {
    info!("generating {} file", MetaTemplate::MetaStudy.file_name());
    let path = layout.meta_path(MetaTemplate::MetaStudy).into_std_path_buf();
    fs_util::write_atomic(&path, render_meta_study(params)?.as_bytes())?;
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Tumour,
    CellLine,
}

impl SampleKind {
    pub fn subtype(&self) -> &'static str {
        match self {
            SampleKind::Tumour => "tumour",
            SampleKind::CellLine => "patient-derived cell line",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub patient_id: String,
    pub sample_id: String,
    pub kind: SampleKind,
}

/// Splits a `PATIENT_SUFFIX` sample id. A `T` suffix marks a tumour sample,
/// anything else a patient-derived cell line.
pub fn parse_sample_id(sample_id: &str) -> Result<Sample, CbioError> {
    let mut tokens = sample_id.split('_');
    let (Some(patient), Some(suffix), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(CbioError::InvalidSampleId(sample_id.to_string()));
    };
    if patient.is_empty() || suffix.is_empty() {
        return Err(CbioError::InvalidSampleId(sample_id.to_string()));
    }
    let kind = if suffix == "T" {
        SampleKind::Tumour
    } else {
        SampleKind::CellLine
    };
    Ok(Sample {
        patient_id: patient.to_string(),
        sample_id: sample_id.to_string(),
        kind,
    })
}

#[derive(Debug, Clone)]
pub struct SegmentStudyParams {
    pub study_id: String,
    pub description: String,
    pub reference_genome_id: String,
    pub file_extension: String,
    pub segment_data_file: String,
    pub sample_data_file: String,
    pub create_case_lists: bool,
    pub case_list_name: String,
}

impl SegmentStudyParams {
    pub fn new(
        study_id: impl Into<String>,
        description: impl Into<String>,
        reference_genome_id: impl Into<String>,
    ) -> Self {
        Self {
            study_id: study_id.into(),
            description: description.into(),
            reference_genome_id: reference_genome_id.into(),
            file_extension: DEFAULT_SEGMENT_EXTENSION.to_string(),
            segment_data_file: DEFAULT_SEGMENT_DATA_FILE.to_string(),
            sample_data_file: DEFAULT_SAMPLE_DATA_FILE.to_string(),
            create_case_lists: false,
            case_list_name: DEFAULT_CASE_LIST_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentStudyReport {
    pub input_files: Vec<String>,
    pub segment_rows: usize,
    pub samples: Vec<Sample>,
    pub written: Vec<String>,
}

/// Generates the copy-number segment part of a study: the two meta files,
/// the merged segment table, the sample table and optionally the
/// all-samples case list.
pub fn write_segment_study(
    layout: &StudyLayout,
    params: &SegmentStudyParams,
) -> Result<SegmentStudyReport, CbioError> {
    if params.create_case_lists {
        fs_util::create_new_dir(layout.case_lists_dir().as_std_path())?;
    }

    let mut written = Vec::new();

    info!("generating {} file", MetaTemplate::MetaCnaSeg.file_name());
    let meta_cna_seg = MetaTemplate::MetaCnaSeg.template().substitute(&BTreeMap::from([
        ("cancer_study_identifier", params.study_id.clone()),
        ("reference_genome_id", params.reference_genome_id.clone()),
        ("description", params.description.clone()),
        ("data_filename", params.segment_data_file.clone()),
    ]))?;
    let path = layout.meta_path(MetaTemplate::MetaCnaSeg);
    fs_util::write_atomic(path.as_std_path(), meta_cna_seg.as_bytes())?;
    written.push(path.to_string());

    info!("generating {} file", MetaTemplate::MetaSamples.file_name());
    let meta_samples = MetaTemplate::MetaSamples.template().substitute(&BTreeMap::from([
        ("cancer_study_identifier", params.study_id.clone()),
        ("data_filename", params.sample_data_file.clone()),
    ]))?;
    let path = layout.meta_path(MetaTemplate::MetaSamples);
    fs_util::write_atomic(path.as_std_path(), meta_samples.as_bytes())?;
    written.push(path.to_string());

    // Generated files share the study directory and may share the extension.
    let outputs: Vec<&str> = [
        params.segment_data_file.as_str(),
        params.sample_data_file.as_str(),
    ]
    .into_iter()
    .chain(MetaTemplate::ALL.iter().map(|template| template.file_name()))
    .collect();
    let inputs: Vec<PathBuf> =
        fs_util::files_with_extension(layout.root().as_std_path(), &params.file_extension)?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| !outputs.contains(&name))
                    .unwrap_or(true)
            })
            .collect();

    let segment_path = layout.data_path(&params.segment_data_file);
    let sample_path = layout.data_path(&params.sample_data_file);
    let (segment_rows, samples) =
        merge_segments(&inputs, segment_path.as_std_path(), sample_path.as_std_path())?;
    written.push(segment_path.to_string());
    written.push(sample_path.to_string());

    if params.create_case_lists && !samples.is_empty() {
        info!("generating {} file", MetaTemplate::CasesAll.file_name());
        let ids = samples
            .iter()
            .map(|sample| sample.sample_id.as_str())
            .collect::<Vec<_>>()
            .join("\t");
        let cases = MetaTemplate::CasesAll.template().substitute(&BTreeMap::from([
            ("cancer_study_identifier", params.study_id.clone()),
            ("stable_id", format!("{}_ALL", params.study_id)),
            ("case_list_name", params.case_list_name.clone()),
            ("case_list_description", params.description.clone()),
            ("case_list_ids", ids),
        ]))?;
        let path = layout.meta_path(MetaTemplate::CasesAll);
        fs_util::write_atomic(path.as_std_path(), cases.as_bytes())?;
        written.push(path.to_string());
    }

    Ok(SegmentStudyReport {
        input_files: inputs
            .iter()
            .map(|path| path.display().to_string())
            .collect(),
        segment_rows,
        samples,
        written,
    })
}

/// Streams the segment `inputs` into one segment table and one sample
/// table. Returns the number of segment rows and the samples in first-seen
/// order.
pub fn merge_segments(
    inputs: &[PathBuf],
    segment_path: &Path,
    sample_path: &Path,
) -> Result<(usize, Vec<Sample>), CbioError> {
    let segment_temp = fs_util::temp_file_for(segment_path)?;
    let sample_temp = fs_util::temp_file_for(sample_path)?;
    let mut segments = BufWriter::new(segment_temp);
    let mut sample_rows = BufWriter::new(sample_temp);

    writeln!(segments, "{SEGMENT_HEADER}").map_err(write_error)?;
    for line in SAMPLE_HEADER {
        writeln!(sample_rows, "{line}").map_err(write_error)?;
    }

    let mut seen = HashSet::new();
    let mut samples = Vec::new();
    let mut rows = 0usize;

    for input in inputs {
        info!(file = %input.display(), "processing segment file");
        let file = File::open(input)
            .map_err(|err| CbioError::Filesystem(format!("open {}: {err}", input.display())))?;
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .map_err(|err| CbioError::Filesystem(format!("read {}: {err}", input.display())))?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let mut fields: Vec<&str> = line.split('\t').collect();
            if fields[0].trim_matches(['"', '\'']).eq_ignore_ascii_case("ID") {
                continue;
            }
            if fields.len() != SEGMENT_COLUMNS {
                return Err(CbioError::MalformedSegmentLine {
                    path: input.clone(),
                    line: idx + 1,
                });
            }
            fields[1] = fields[1].strip_prefix("chr").unwrap_or(fields[1]);
            debug!(line, "segment");

            let sample = parse_sample_id(fields[0])?;
            if seen.insert(sample.sample_id.clone()) {
                writeln!(
                    sample_rows,
                    "{}\t{}\t{}",
                    sample.patient_id,
                    sample.sample_id,
                    sample.kind.subtype()
                )
                .map_err(write_error)?;
                samples.push(sample);
            }
            writeln!(segments, "{}", fields.join("\t")).map_err(write_error)?;
            rows += 1;
        }
    }

    let segment_temp = segments
        .into_inner()
        .map_err(|err| write_error(err.into_error()))?;
    let sample_temp = sample_rows
        .into_inner()
        .map_err(|err| write_error(err.into_error()))?;
    fs_util::persist(segment_temp, segment_path)?;
    fs_util::persist(sample_temp, sample_path)?;
    Ok((rows, samples))
}

fn write_error(err: std::io::Error) -> CbioError {
    CbioError::Filesystem(err.to_string())
}
