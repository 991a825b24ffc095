//! Pairwise similarity between samples from different datasets.
//!
//! Samples are first normalised against their own dataset (boilerplate tokens
//! shared by most titles in a dataset and microarray names are dropped), then
//! compared with an edit-distance similarity over titles and a weaker token
//! overlap over descriptions. Titles are also compared without the boilerplate
//! step, since a token can be boilerplate on one platform and not on another. Two-channel samples also compare channel by
//! channel, in both pairings, so label-swapped channels still line up.

use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::{SampleAccession, SampleDataset, SampleMetadata};
use crate::error::CombinerError;
use crate::text::{
    PlatformMarkers, boilerplate_tokens, default_platform_markers, edit_similarity,
    jaccard_similarity, strip_boilerplate, tokenize,
};

pub const DEFAULT_BOILERPLATE_FRACTION: f64 = 0.8;
pub const DEFAULT_DESCRIPTION_WEIGHT: f64 = 0.2;

/// A sample with its text already normalised in the context of its dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSample {
    pub accession: SampleAccession,
    pub dataset_id: String,
    pub title: String,
    /// Title with only platform markers removed.
    pub raw_title: String,
    pub secondary_title: Option<String>,
    pub raw_secondary_title: Option<String>,
    pub description: BTreeSet<String>,
    pub channels: Option<[BTreeSet<String>; 2]>,
    pub organism: Option<String>,
}

/// Two samples from different datasets and their similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair<'a> {
    pub sample_a: &'a PreparedSample,
    pub sample_b: &'a PreparedSample,
    pub score: f64,
}

impl CandidatePair<'_> {
    /// Distance between the trailing accession numbers; `u64::MAX` when either has none.
    pub fn accession_gap(&self) -> u64 {
        match (
            self.sample_a.accession.numeric_suffix(),
            self.sample_b.accession.numeric_suffix(),
        ) {
            (Some(a), Some(b)) => a.abs_diff(b),
            _ => u64::MAX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    markers: PlatformMarkers,
    boilerplate_fraction: f64,
    description_weight: f64,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(
            &default_platform_markers(),
            DEFAULT_BOILERPLATE_FRACTION,
            DEFAULT_DESCRIPTION_WEIGHT,
        )
    }
}

impl SimilarityScorer {
    pub fn new<S: AsRef<str>>(
        platform_markers: &[S],
        boilerplate_fraction: f64,
        description_weight: f64,
    ) -> Self {
        Self {
            markers: PlatformMarkers::new(platform_markers),
            boilerplate_fraction,
            description_weight,
        }
    }

    /// Normalises every sample of a dataset against the dataset's own boilerplate.
    pub fn prepare_dataset(
        &self,
        dataset: &SampleDataset,
    ) -> Result<Vec<PreparedSample>, CombinerError> {
        let titles = dataset
            .samples
            .iter()
            .map(|sample| self.markers.strip(tokenize(&sample.title)))
            .collect::<Vec<_>>();
        let secondary = dataset
            .samples
            .iter()
            .map(|sample| {
                sample
                    .title_in_dataset
                    .as_deref()
                    .map(|title| self.markers.strip(tokenize(title)))
            })
            .collect::<Vec<_>>();
        let descriptions = dataset
            .samples
            .iter()
            .map(|sample| tokenize(&sample.description))
            .collect::<Vec<_>>();

        let title_boilerplate = boilerplate_tokens(&titles, self.boilerplate_fraction);
        let secondary_boilerplate = boilerplate_tokens(
            &secondary.iter().flatten().cloned().collect::<Vec<_>>(),
            self.boilerplate_fraction,
        );
        let description_boilerplate = boilerplate_tokens(&descriptions, self.boilerplate_fraction);
        if !title_boilerplate.is_empty() {
            debug!(dataset = %dataset.id, tokens = ?title_boilerplate, "title boilerplate");
        }

        dataset
            .samples
            .iter()
            .zip(titles)
            .zip(secondary)
            .zip(descriptions)
            .map(|(((sample, title), secondary), description)| {
                Ok(PreparedSample {
                    accession: sample.sample_id.parse()?,
                    dataset_id: dataset.id.trim().to_string(),
                    raw_title: title.concat(),
                    title: strip_boilerplate(title, &title_boilerplate).concat(),
                    raw_secondary_title: secondary
                        .as_ref()
                        .map(|tokens| tokens.concat())
                        .filter(|title| !title.is_empty()),
                    secondary_title: secondary
                        .map(|tokens| strip_boilerplate(tokens, &secondary_boilerplate).concat())
                        .filter(|title| !title.is_empty()),
                    description: description
                        .into_iter()
                        .filter(|token| !description_boilerplate.contains(token))
                        .collect(),
                    channels: self.prepare_channels(sample),
                    organism: sample
                        .organism
                        .as_deref()
                        .map(|organism| organism.trim().to_lowercase())
                        .filter(|organism| !organism.is_empty()),
                })
            })
            .collect::<Result<Vec<_>, CombinerError>>()
    }

    /// Normalises a single record without any dataset context.
    pub fn prepare_sample(&self, sample: &SampleMetadata) -> Result<PreparedSample, CombinerError> {
        let dataset = SampleDataset::new(sample.dataset_id.clone(), vec![sample.clone()]);
        let mut prepared = self.prepare_dataset(&dataset)?;
        Ok(prepared.remove(0))
    }

    fn prepare_channels(&self, sample: &SampleMetadata) -> Option<[BTreeSet<String>; 2]> {
        if sample.channel_count != 2 {
            return None;
        }
        match sample.channels.as_slice() {
            [ch1, ch2] => Some([
                tokenize(ch1).into_iter().collect(),
                tokenize(ch2).into_iter().collect(),
            ]),
            _ => None,
        }
    }

    /// Builds a candidate pair, or `None` when the two samples may not correspond:
    /// same dataset, or declared organisms that differ.
    pub fn candidate<'a>(
        &self,
        sample_a: &'a PreparedSample,
        sample_b: &'a PreparedSample,
    ) -> Option<CandidatePair<'a>> {
        if sample_a.dataset_id == sample_b.dataset_id {
            return None;
        }
        if let (Some(a), Some(b)) = (&sample_a.organism, &sample_b.organism) {
            if a != b {
                return None;
            }
        }
        Some(CandidatePair {
            sample_a,
            sample_b,
            score: self.score(sample_a, sample_b),
        })
    }

    /// Similarity in [0, 1]. Samples from the same dataset score 0.
    pub fn score(&self, sample_a: &PreparedSample, sample_b: &PreparedSample) -> f64 {
        if sample_a.dataset_id == sample_b.dataset_id {
            return 0.0;
        }
        let description = description_signal(sample_a, sample_b);
        let score = match title_signal(sample_a, sample_b) {
            Some(title) if title >= 1.0 => 1.0,
            Some(title) => title + self.description_weight * (description - title).max(0.0),
            None => description,
        };
        score.clamp(0.0, 1.0)
    }
}

/// Best of the stripped and marker-only comparisons, over primary and secondary titles.
fn title_signal(sample_a: &PreparedSample, sample_b: &PreparedSample) -> Option<f64> {
    let primary = (!sample_a.title.is_empty() && !sample_b.title.is_empty()).then(|| {
        edit_similarity(&sample_a.title, &sample_b.title)
            .max(edit_similarity(&sample_a.raw_title, &sample_b.raw_title))
    });
    let secondary = match (&sample_a.secondary_title, &sample_b.secondary_title) {
        (Some(a), Some(b)) => {
            let raw = match (&sample_a.raw_secondary_title, &sample_b.raw_secondary_title) {
                (Some(raw_a), Some(raw_b)) => edit_similarity(raw_a, raw_b),
                _ => 0.0,
            };
            Some(edit_similarity(a, b).max(raw))
        }
        _ => None,
    };
    match (primary, secondary) {
        (Some(p), Some(s)) => Some(p.max(s)),
        (p, s) => p.or(s),
    }
}

fn description_signal(sample_a: &PreparedSample, sample_b: &PreparedSample) -> f64 {
    let overlap = jaccard_similarity(&sample_a.description, &sample_b.description);
    let channels = match (&sample_a.channels, &sample_b.channels) {
        (Some([a1, a2]), Some([b1, b2])) => {
            let forward = (jaccard_similarity(a1, b1) + jaccard_similarity(a2, b2)) / 2.0;
            let reverse = (jaccard_similarity(a1, b2) + jaccard_similarity(a2, b1)) / 2.0;
            forward.max(reverse)
        }
        _ => 0.0,
    };
    overlap.max(channels)
}
