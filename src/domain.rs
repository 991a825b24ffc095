use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CombinerError;

/// Dataset name given to samples that carry no platform id when a series is
/// partitioned by platform.
pub const UNKNOWN_PLATFORM: &str = "unknown-platform";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SampleAccession(String);

impl SampleAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing run of digits, e.g. `12929` for `GSM12929`.
    pub fn numeric_suffix(&self) -> Option<u64> {
        trailing_number(&self.0)
    }
}

impl fmt::Display for SampleAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleAccession {
    type Err = CombinerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
            return Err(CombinerError::InvalidSampleAccession(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatasetAccession(String);

impl DatasetAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetAccession {
    type Err = CombinerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(CombinerError::InvalidDatasetAccession(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// Descriptive metadata for one sample, as produced by the metadata parsing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub sample_id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_in_dataset: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_channel_count")]
    pub channel_count: u8,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub organism: Option<String>,
}

impl SampleMetadata {
    pub fn new(
        sample_id: impl Into<String>,
        dataset_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            sample_id: sample_id.into(),
            dataset_id: dataset_id.into(),
            platform_id: None,
            title: title.into(),
            title_in_dataset: None,
            description: String::new(),
            channel_count: default_channel_count(),
            channels: Vec::new(),
            organism: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_platform(mut self, platform_id: impl Into<String>) -> Self {
        self.platform_id = Some(platform_id.into());
        self
    }

    pub fn with_title_in_dataset(mut self, title: impl Into<String>) -> Self {
        self.title_in_dataset = Some(title.into());
        self
    }

    pub fn with_organism(mut self, organism: impl Into<String>) -> Self {
        self.organism = Some(organism.into());
        self
    }

    /// Marks the sample as two-channel with the given per-channel descriptions.
    pub fn with_channels(mut self, ch1: impl Into<String>, ch2: impl Into<String>) -> Self {
        self.channel_count = 2;
        self.channels = vec![ch1.into(), ch2.into()];
        self
    }

    pub fn has_text(&self) -> bool {
        !self.title.trim().is_empty()
            || !self.description.trim().is_empty()
            || self
                .title_in_dataset
                .as_deref()
                .is_some_and(|title| !title.trim().is_empty())
            || self.channels.iter().any(|channel| !channel.trim().is_empty())
    }
}

fn default_channel_count() -> u8 {
    1
}

/// One dataset (a GDS, or the samples of one platform) and its samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDataset {
    pub id: String,
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub samples: Vec<SampleMetadata>,
}

impl SampleDataset {
    pub fn new(id: impl Into<String>, samples: Vec<SampleMetadata>) -> Self {
        Self {
            id: id.into(),
            platform_id: None,
            samples,
        }
    }

    pub fn with_platform(mut self, platform_id: impl Into<String>) -> Self {
        self.platform_id = Some(platform_id.into());
        self
    }
}

/// Groups the samples of a series into one dataset per platform.
///
/// Used when a series has no curated datasets: each platform then plays the
/// role of a dataset. Every sample's `dataset_id` is rewritten to its
/// platform so the result satisfies the combiner's input contract.
pub fn partition_by_platform(samples: Vec<SampleMetadata>) -> Vec<SampleDataset> {
    let mut by_platform = BTreeMap::<String, Vec<SampleMetadata>>::new();
    for mut sample in samples {
        let platform = sample
            .platform_id
            .clone()
            .filter(|platform| !platform.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_PLATFORM.to_string());
        sample.dataset_id = platform.clone();
        by_platform.entry(platform).or_default().push(sample);
    }

    by_platform
        .into_iter()
        .map(|(platform, samples)| SampleDataset {
            id: platform.clone(),
            platform_id: (platform != UNKNOWN_PLATFORM).then_some(platform),
            samples,
        })
        .collect()
}

fn trailing_number(value: &str) -> Option<u64> {
    let digits_start = value
        .char_indices()
        .rev()
        .take_while(|(_, ch)| ch.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx)?;
    value[digits_start..].parse().ok()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_sample_accession_trims() {
        let acc: SampleAccession = " GSM10354 ".parse().unwrap();
        assert_eq!(acc.as_str(), "GSM10354");
        assert_eq!(acc.numeric_suffix(), Some(10354));
    }

    #[test]
    fn parse_sample_accession_rejects_blank() {
        let err = "   ".parse::<SampleAccession>().unwrap_err();
        assert_matches!(err, CombinerError::InvalidSampleAccession(_));
    }

    #[test]
    fn parse_sample_accession_rejects_inner_whitespace() {
        let err = "GSM 1".parse::<SampleAccession>().unwrap_err();
        assert_matches!(err, CombinerError::InvalidSampleAccession(_));
    }

    #[test]
    fn numeric_suffix_absent() {
        let acc: SampleAccession = "sampleA".parse().unwrap();
        assert_eq!(acc.numeric_suffix(), None);
    }

    #[test]
    fn partition_groups_by_platform() {
        let samples = vec![
            SampleMetadata::new("GSM3", "GSE1", "a").with_platform("GPL2"),
            SampleMetadata::new("GSM1", "GSE1", "b").with_platform("GPL1"),
            SampleMetadata::new("GSM2", "GSE1", "c"),
        ];
        let datasets = partition_by_platform(samples);
        let ids = datasets.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["GPL1", "GPL2", UNKNOWN_PLATFORM]);
        assert_eq!(datasets[0].samples[0].dataset_id, "GPL1");
        assert_eq!(datasets[2].platform_id, None);
    }
}
