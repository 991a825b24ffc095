use std::io::Write;

use assert_matches::assert_matches;
use tempfile::NamedTempFile;

use kira_geo_combiner::combiner::MatchMode;
use kira_geo_combiner::config::{Config, ConfigLoader};
use kira_geo_combiner::error::CombinerError;

#[test]
fn empty_config_resolves_to_defaults() {
    let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.options.mode, MatchMode::Permissive);
    assert_eq!(resolved.options.threshold(), 0.5);
    assert!(resolved.options.sample_matching);
}

#[test]
fn load_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"schema_version": 1, "mode": "strict", "sample_matching": false}}"#
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(file.path().to_str()).unwrap();
    assert_eq!(resolved.options.mode, MatchMode::Strict);
    assert_eq!(resolved.options.threshold(), 0.7);
    assert!(!resolved.options.sample_matching);
}

#[test]
fn explicit_missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, CombinerError::ConfigRead(_));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let err = ConfigLoader::resolve(file.path().to_str()).unwrap_err();
    assert_matches!(err, CombinerError::ConfigParse(_));
}

#[test]
fn out_of_range_threshold_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"threshold": 1.5}}"#).unwrap();
    let err = ConfigLoader::resolve(file.path().to_str()).unwrap_err();
    assert_matches!(err, CombinerError::InvalidThreshold(_));
}
