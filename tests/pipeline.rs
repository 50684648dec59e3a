#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use assert_matches::assert_matches;

use cbio_importer::error::CbioError;
use cbio_importer::pipeline::{ImportRequest, JarStudyTool, PortalSource, run_meta_import};

/// Writes an executable stand-in for `java`. It sees
/// `-jar <jar> validate|import ...` and records every call in `calls.log`.
fn fake_java(dir: &Path, validate: &str, import: &str) -> PathBuf {
    let path = dir.join("java");
    let script = format!(
        "#!/bin/sh\n\
         echo \"$3\" >> \"{log}\"\n\
         case \"$3\" in\n\
           validate) {validate} ;;\n\
           import) {import} ;;\n\
         esac\n",
        log = dir.join("calls.log").display()
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn warnings_are_imported_only_when_overridden() {
    let temp = tempfile::tempdir().unwrap();
    let java = fake_java(temp.path(), "exit 3", "exit 0");
    let tool = JarStudyTool::new(temp.path().join("scripts.jar")).with_java(java);
    let mut request = ImportRequest::new(temp.path());
    request.portal = PortalSource::NoChecks;

    assert_eq!(run_meta_import(&tool, &request).unwrap(), 3);
    assert_eq!(calls(temp.path()), vec!["validate"]);

    request.override_warnings = true;
    assert_eq!(run_meta_import(&tool, &request).unwrap(), 0);
    assert_eq!(calls(temp.path()), vec!["validate", "validate", "import"]);
}

#[test]
fn failed_import_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let java = fake_java(temp.path(), "exit 0", "exit 4");
    let tool = JarStudyTool::new(temp.path().join("scripts.jar")).with_java(java);

    assert_matches!(
        run_meta_import(&tool, &ImportRequest::new(temp.path())),
        Err(CbioError::StudyTool(_))
    );
}

#[test]
fn killed_import_is_an_interruption() {
    let temp = tempfile::tempdir().unwrap();
    let java = fake_java(temp.path(), "exit 0", "kill -9 $$");
    let tool = JarStudyTool::new(temp.path().join("scripts.jar")).with_java(java);

    let err = run_meta_import(&tool, &ImportRequest::new(temp.path())).unwrap_err();
    assert_matches!(err, CbioError::Interrupted("import"));
    assert_eq!(err.exit_code(), 130);
}

#[test]
fn killed_validation_is_an_interruption() {
    let temp = tempfile::tempdir().unwrap();
    let java = fake_java(temp.path(), "kill -9 $$", "exit 0");
    let tool = JarStudyTool::new(temp.path().join("scripts.jar")).with_java(java);

    let err = run_meta_import(&tool, &ImportRequest::new(temp.path())).unwrap_err();
    assert_matches!(err, CbioError::Interrupted("validation"));
    assert_eq!(err.exit_code(), 130);
    assert_eq!(calls(temp.path()), vec!["validate"]);
}

#[test]
fn ctrl_c_during_validation_stops_before_import() {
    let temp = tempfile::tempdir().unwrap();
    let java = fake_java(temp.path(), "exit 0", "exit 0");
    let tool = JarStudyTool::new(temp.path().join("scripts.jar"))
        .with_java(java)
        .with_interrupt_flag(Arc::new(AtomicBool::new(true)));

    assert_matches!(
        run_meta_import(&tool, &ImportRequest::new(temp.path())),
        Err(CbioError::Interrupted("validation"))
    );
    assert_eq!(calls(temp.path()), vec!["validate"]);
}

#[test]
fn missing_java_is_a_tool_error() {
    let temp = tempfile::tempdir().unwrap();
    let tool = JarStudyTool::new("scripts.jar").with_java(temp.path().join("no-java"));
    assert_matches!(
        run_meta_import(&tool, &ImportRequest::new(temp.path())),
        Err(CbioError::StudyTool(_))
    );
}
