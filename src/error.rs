use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CombinerError {
    #[error("no datasets supplied")]
    NoDatasets,

    #[error("dataset {0} supplied more than once")]
    DuplicateDataset(String),

    #[error("sample without an id in dataset {dataset}")]
    MissingSampleId { dataset: String },

    #[error("invalid sample accession: {0}")]
    InvalidSampleAccession(String),

    #[error("invalid dataset accession: {0}")]
    InvalidDatasetAccession(String),

    #[error("sample {sample} appears more than once (dataset {dataset})")]
    DuplicateSample { sample: String, dataset: String },

    #[error("sample {sample} claims dataset {claimed} but is listed under {dataset}")]
    DatasetMismatch {
        sample: String,
        claimed: String,
        dataset: String,
    },

    #[error("sample {sample} has unsupported channel count {count}")]
    InvalidChannelCount { sample: String, count: u8 },

    #[error("acceptance threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("boilerplate fraction must be in (0, 1], got {0}")]
    InvalidBoilerplateFraction(f64),

    #[error("description weight must be in [0, 1], got {0}")]
    InvalidDescriptionWeight(f64),

    #[error("missing config file kira-gc.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read input file at {path}: {message}")]
    InputRead { path: PathBuf, message: String },

    #[error("failed to parse sample input: {0}")]
    InputParse(String),
}
