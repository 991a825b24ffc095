use std::fs;
use std::io::Read;

use camino::Utf8Path;
use flate2::read::GzDecoder;
use serde::Deserialize;

use crate::domain::{SampleDataset, SampleMetadata, partition_by_platform};
use crate::error::CombinerError;

/// Sample metadata as handed over by the parsing layer: either explicit
/// datasets, or the flat sample list of a series to be split by platform.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SampleInput {
    Datasets { datasets: Vec<SampleDataset> },
    Series {
        series: String,
        samples: Vec<SampleMetadata>,
    },
}

impl SampleInput {
    pub fn into_datasets(self) -> Vec<SampleDataset> {
        match self {
            SampleInput::Datasets { datasets } => datasets,
            SampleInput::Series { samples, .. } => partition_by_platform(samples),
        }
    }
}

pub fn parse_input(text: &str) -> Result<SampleInput, CombinerError> {
    serde_json::from_str(text).map_err(|err| CombinerError::InputParse(err.to_string()))
}

/// Reads a JSON input file; `.gz` files are decompressed first.
pub fn load_input(path: &Utf8Path) -> Result<SampleInput, CombinerError> {
    let read_error = |message: String| CombinerError::InputRead {
        path: path.as_std_path().to_path_buf(),
        message,
    };

    let bytes = fs::read(path).map_err(|err| read_error(err.to_string()))?;
    let text = if path.extension() == Some("gz") {
        let mut decoder = GzDecoder::new(bytes.as_slice());
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(|err| read_error(err.to_string()))?;
        text
    } else {
        String::from_utf8(bytes).map_err(|err| read_error(err.to_string()))?
    };

    parse_input(&text)
}
