use std::io::Write;

use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;

use kira_geo_combiner::combiner::DatasetCombiner;
use kira_geo_combiner::input::load_input;

const SERIES: &str = r#"{"series": "GSE674", "samples": [
    {"sample_id": "GSM10001", "dataset_id": "GSE674", "platform_id": "GPL96", "title": "C6-U133A"},
    {"sample_id": "GSM10002", "dataset_id": "GSE674", "platform_id": "GPL96", "title": "C7-U133A"},
    {"sample_id": "GSM10011", "dataset_id": "GSE674", "platform_id": "GPL97", "title": "C6-U133B"},
    {"sample_id": "GSM10012", "dataset_id": "GSE674", "platform_id": "GPL97", "title": "C7-U133B"}
]}"#;

#[test]
fn load_gzipped_series() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("GSE674.json.gz")).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(SERIES.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let datasets = load_input(&path).unwrap().into_datasets();
    assert_eq!(datasets.len(), 2);

    let result = DatasetCombiner::default()
        .find_correspondence(&datasets)
        .unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.group_of("GSM10001"), result.group_of("GSM10011"));
    assert_eq!(result.group_of("GSM10002"), result.group_of("GSM10012"));
}

#[test]
fn load_plain_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("GSE674.json")).unwrap();
    std::fs::write(&path, SERIES).unwrap();
    let datasets = load_input(&path).unwrap().into_datasets();
    assert_eq!(datasets[0].id, "GPL96");
}
