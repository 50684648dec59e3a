use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::error::CbioError;

/// Writes `content` to `path` through a temporary file in the same
/// directory, so readers never observe a half-written file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), CbioError> {
    let mut temp = temp_file_for(path)?;
    temp.write_all(content)
        .map_err(|err| CbioError::Filesystem(format!("write {}: {err}", path.display())))?;
    persist(temp, path)
}

/// Opens a temporary file next to `path`; finish it with [`persist`].
pub fn temp_file_for(path: &Path) -> Result<NamedTempFile, CbioError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|err| CbioError::Filesystem(err.to_string()))?;
    Builder::new()
        .prefix(".cbio-importer")
        .tempfile_in(parent)
        .map_err(|err| CbioError::Filesystem(err.to_string()))
}

pub fn persist(temp: NamedTempFile, path: &Path) -> Result<(), CbioError> {
    temp.persist(path)
        .map(|_| ())
        .map_err(|err| CbioError::Filesystem(format!("persist {}: {}", path.display(), err.error)))
}

/// Creates `path` (and missing parents). An existing directory is reported
/// as [`CbioError::DirectoryExists`].
pub fn create_new_dir(path: &Path) -> Result<(), CbioError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| CbioError::Filesystem(err.to_string()))?;
    }
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(CbioError::DirectoryExists(path.to_path_buf()))
        }
        Err(err) => Err(CbioError::Filesystem(format!(
            "create {}: {err}",
            path.display()
        ))),
    }
}

/// Regular files directly inside `dir` whose extension is `ext`, sorted by
/// name.
pub fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, CbioError> {
    let entries = fs::read_dir(dir)
        .map_err(|err| CbioError::Filesystem(format!("read {}: {err}", dir.display())))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| CbioError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .and_then(|value| value.to_str())
                .map(|value| value == ext)
                .unwrap_or(false)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn existing_directory_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("case_lists");
        create_new_dir(&target).unwrap();
        assert_matches!(create_new_dir(&target), Err(CbioError::DirectoryExists(path)) if path == target);
    }

    #[test]
    fn lists_matching_files_in_name_order() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["b.seg", "a.seg", "c.txt"] {
            fs::write(temp.path().join(name), b"").unwrap();
        }
        fs::create_dir(temp.path().join("d.seg")).unwrap();

        let files = files_with_extension(temp.path(), "seg").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.seg", "b.seg"]);
    }

    #[test]
    fn atomic_write_replaces_content() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("meta.txt");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
