use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::CbioError;
use crate::template::MetaTemplate;

pub const CASE_LISTS_DIR: &str = "case_lists";
pub const DEFAULT_SEGMENT_DATA_FILE: &str = "data_cna_seg.txt";
pub const DEFAULT_SAMPLE_DATA_FILE: &str = "data_samples.txt";

/// File layout of a study directory as the portal importer expects it.
#[derive(Debug, Clone)]
pub struct StudyLayout {
    root: Utf8PathBuf,
}

impl StudyLayout {
    pub fn new(root: &Path) -> Result<Self, CbioError> {
        let root = Utf8PathBuf::from_path_buf(root.to_path_buf()).map_err(|path| {
            CbioError::Filesystem(format!("study path is not UTF-8: {}", path.display()))
        })?;
        if !root.is_dir() {
            return Err(CbioError::Filesystem(format!(
                "study directory does not exist: {root}"
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn meta_path(&self, template: MetaTemplate) -> Utf8PathBuf {
        match template {
            MetaTemplate::CasesAll => self.case_lists_dir().join(template.file_name()),
            _ => self.root.join(template.file_name()),
        }
    }

    pub fn data_path(&self, file_name: &str) -> Utf8PathBuf {
        self.root.join(file_name)
    }

    pub fn case_lists_dir(&self) -> Utf8PathBuf {
        self.root.join(CASE_LISTS_DIR)
    }
}
