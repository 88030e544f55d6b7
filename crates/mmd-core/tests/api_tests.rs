//! Integration tests for the public find/query/stage/install operations.

use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use model_metadata::{
    find, install, query, stage, ComponentHandle, InstallOptions, MetadataError, ModelMetadata,
    ModelRef, Scalar,
};
use tempfile::TempDir;

/// Create a metadata directory for a model named Child.
fn create_test_metadata() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");

    fs::write(
        dir.path().join("api.yaml"),
        "name: Child\ncmd: run-child\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("info.yaml"),
        concat!(
            "name: Child\n",
            "author: Hutton, Eric\n",
            "email: eric.hutton@colorado.edu\n",
            "version: '10.6'\n",
            "license: MIT\n",
            "url: https://csdms.colorado.edu\n",
            "summary: A coastal evolution model.\n",
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join("parameters.yaml"),
        concat!(
            "run_duration:\n",
            "  description: Simulation run time.\n",
            "  value:\n",
            "    default: 10\n",
            "    type: int\n",
            "    units: d\n",
            "    range:\n",
            "      min: 1\n",
            "      max: 10000\n",
            "spacing:\n",
            "  value: 500.0\n",
        ),
    )
    .unwrap();
    fs::write(dir.path().join("run.yaml"), "config_file: child.in\n").unwrap();
    fs::write(
        dir.path().join("child.in"),
        "run_duration: {run_duration}\nspacing: {spacing}\n",
    )
    .unwrap();

    dir
}

#[test]
fn test_find_from_path() {
    let datadir = create_test_metadata();
    let found = find(&ModelRef::from(datadir.path())).unwrap();
    assert_eq!(found, datadir.path());
}

#[test]
fn test_find_from_component() {
    let datadir = create_test_metadata();
    let handle = model_metadata::register(
        ComponentHandle::new("child", "Child").with_metadata(datadir.path()),
    );

    let found = find(&ModelRef::from(handle)).unwrap();
    assert_eq!(found, datadir.path());

    let found = find(&ModelRef::resolve("child:Child")).unwrap();
    assert_eq!(found, datadir.path());
}

#[test]
fn test_find_bad_model_is_not_found() {
    let err = find(&ModelRef::resolve("/path/does/not/exist")).unwrap_err();
    assert!(matches!(err, MetadataError::NotFound { .. }));

    // A file is not a metadata directory.
    let datadir = create_test_metadata();
    let err = find(&ModelRef::from(datadir.path().join("child.in"))).unwrap_err();
    assert!(matches!(err, MetadataError::NotFound { .. }));
}

#[test]
fn test_query_info_version() {
    let datadir = create_test_metadata();
    let version = query(&ModelRef::from(datadir.path()), "info.version").unwrap();
    assert_eq!(version.as_str(), Some("10.6"));
}

#[test]
fn test_query_normalized_run_section() {
    let datadir = create_test_metadata();
    let model = ModelRef::from(datadir.path());

    let path = query(&model, "run.config_file.path").unwrap();
    assert_eq!(path.as_str(), Some("child.in"));

    let contents = query(&model, "run.config_file.contents").unwrap();
    assert!(contents.is_null());
}

#[test]
fn test_query_missing_discrimination() {
    let datadir = create_test_metadata();
    let model = ModelRef::from(datadir.path());

    let err = query(&model, "info.nope").unwrap_err();
    assert!(matches!(err, MetadataError::MissingValue { ref name } if name == "info.nope"));

    let err = query(&model, "info.nope.deeper").unwrap_err();
    assert!(matches!(err, MetadataError::MissingSection { ref name } if name == "info.nope"));
}

#[test]
fn test_stage_with_defaults() {
    let datadir = create_test_metadata();
    let dest = TempDir::new().unwrap();

    let manifest = stage(&ModelRef::from(datadir.path()), dest.path(), None).unwrap();
    assert_eq!(manifest, [PathBuf::from("child.in")]);

    let staged = fs::read_to_string(dest.path().join("child.in")).unwrap();
    assert_eq!(staged, "run_duration: 10\nspacing: 500.0\n");
}

#[test]
fn test_stage_with_overrides() {
    let datadir = create_test_metadata();
    let dest = TempDir::new().unwrap();

    let mut overrides = IndexMap::new();
    overrides.insert("run_duration".to_string(), Scalar::Int(999));
    stage(
        &ModelRef::from(datadir.path()),
        dest.path(),
        Some(&overrides),
    )
    .unwrap();

    let staged = fs::read_to_string(dest.path().join("child.in")).unwrap();
    assert_eq!(staged, "run_duration: 999\nspacing: 500.0\n");
}

#[test]
fn test_stage_with_unknown_override_fails() {
    let datadir = create_test_metadata();
    let dest = TempDir::new().unwrap();

    let mut overrides = IndexMap::new();
    overrides.insert("unknown_param".to_string(), Scalar::Int(1));
    let err = stage(
        &ModelRef::from(datadir.path()),
        dest.path(),
        Some(&overrides),
    )
    .unwrap_err();

    match err {
        MetadataError::UnknownKeys { keys, valid } => {
            assert_eq!(keys, ["unknown_param"]);
            assert_eq!(valid, ["run_duration", "spacing"]);
        }
        other => panic!("wrong error: {other}"),
    }
    assert!(!dest.path().join("child.in").exists());
}

#[test]
fn test_install_copies_all_files() {
    let datadir = create_test_metadata();
    let dest = TempDir::new().unwrap();

    let installed = install(datadir.path(), dest.path(), InstallOptions::default()).unwrap();
    let mut names: Vec<String> = installed
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        ["api.yaml", "child.in", "info.yaml", "parameters.yaml", "run.yaml"]
    );
    for name in names {
        assert!(dest.path().join(name).is_file());
    }
}

#[test]
fn test_loading_twice_is_idempotent() {
    let datadir = create_test_metadata();
    let first = ModelMetadata::from_path(datadir.path()).unwrap();
    let second = ModelMetadata::from_path(datadir.path()).unwrap();
    assert_eq!(first.dump().unwrap(), second.dump().unwrap());
}

#[test]
fn test_metadata_from_combined_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("meta.yaml"),
        concat!(
            "api:\n  name: Child\n",
            "info:\n  version: '10.6'\n",
            "parameters:\n  run_duration:\n    value: {default: 10, type: int}\n",
            "run:\n  config_file: child.in\n",
        ),
    )
    .unwrap();

    let meta = ModelMetadata::from_path(dir.path()).unwrap();
    assert_eq!(meta.name(), "Child");
    assert_eq!(meta.get("info.version").unwrap().as_str(), Some("10.6"));
    assert_eq!(
        meta.parameters()["run_duration"].default(),
        Scalar::Int(10)
    );
}
