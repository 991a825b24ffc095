//! Lines up samples across datasets that describe the same experiment.
//!
//! A series can be split over several datasets, one per array platform (the
//! "A" and "B" chips of a set, for instance), with every biological sample
//! hybridised once per platform. Nothing in the metadata says which samples
//! belong together, so they are matched on their titles and descriptions.
//!
//! Matching is greedy. All cross-dataset pairs scoring at or above the
//! acceptance threshold are sorted by score (ties go to the pair with the
//! closest accession numbers, then to the lexicographically smaller ids) and
//! accepted in that order unless the pair's samples are already grouped, or
//! grouping them would put two samples of one dataset together. A group
//! therefore never holds more than one sample per dataset.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::correspondence::{AcceptedMatch, SampleCorrespondence};
use crate::domain::{DatasetAccession, SampleAccession, SampleDataset};
use crate::error::CombinerError;
use crate::scorer::{
    CandidatePair, DEFAULT_BOILERPLATE_FRACTION, DEFAULT_DESCRIPTION_WEIGHT, PreparedSample,
    SimilarityScorer,
};
use crate::text::default_platform_markers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Threshold 0.5; tied candidates are resolved by accession proximity.
    #[default]
    Permissive,
    /// Threshold 0.7; a sample with tied candidates in a dataset is left unmatched there.
    Strict,
}

impl MatchMode {
    pub fn default_threshold(self) -> f64 {
        match self {
            MatchMode::Permissive => 0.5,
            MatchMode::Strict => 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinerOptions {
    pub mode: MatchMode,
    /// Overrides the mode's threshold.
    pub threshold: Option<f64>,
    /// When false every sample ends up in its own group.
    pub sample_matching: bool,
    pub boilerplate_fraction: f64,
    pub description_weight: f64,
    pub platform_markers: Vec<String>,
}

impl Default for CombinerOptions {
    fn default() -> Self {
        Self {
            mode: MatchMode::default(),
            threshold: None,
            sample_matching: true,
            boilerplate_fraction: DEFAULT_BOILERPLATE_FRACTION,
            description_weight: DEFAULT_DESCRIPTION_WEIGHT,
            platform_markers: default_platform_markers(),
        }
    }
}

impl CombinerOptions {
    pub fn threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.mode.default_threshold())
    }

    pub fn validate(&self) -> Result<(), CombinerError> {
        let threshold = self.threshold();
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(CombinerError::InvalidThreshold(threshold));
        }
        if !(self.boilerplate_fraction > 0.0 && self.boilerplate_fraction <= 1.0) {
            return Err(CombinerError::InvalidBoilerplateFraction(
                self.boilerplate_fraction,
            ));
        }
        if !(0.0..=1.0).contains(&self.description_weight) {
            return Err(CombinerError::InvalidDescriptionWeight(
                self.description_weight,
            ));
        }
        Ok(())
    }
}

/// Stateless resolver; safe to share between threads and reuse across calls.
#[derive(Debug, Clone)]
pub struct DatasetCombiner {
    options: CombinerOptions,
    scorer: SimilarityScorer,
}

impl Default for DatasetCombiner {
    fn default() -> Self {
        Self::from_parts(CombinerOptions::default())
    }
}

impl DatasetCombiner {
    pub fn new(options: CombinerOptions) -> Result<Self, CombinerError> {
        options.validate()?;
        Ok(Self::from_parts(options))
    }

    pub fn with_mode(mode: MatchMode) -> Self {
        Self::from_parts(CombinerOptions {
            mode,
            ..CombinerOptions::default()
        })
    }

    fn from_parts(options: CombinerOptions) -> Self {
        let scorer = SimilarityScorer::new(
            &options.platform_markers,
            options.boilerplate_fraction,
            options.description_weight,
        );
        Self { options, scorer }
    }

    pub fn options(&self) -> &CombinerOptions {
        &self.options
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Groups the samples of `datasets` into sets of corresponding samples.
    ///
    /// Fails only on malformed input: no datasets, blank or repeated sample
    /// ids, a sample listed under a dataset it does not claim, or a channel
    /// count other than 1 or 2. Poorly described samples simply stay alone.
    pub fn find_correspondence(
        &self,
        datasets: &[SampleDataset],
    ) -> Result<SampleCorrespondence, CombinerError> {
        if datasets.is_empty() {
            return Err(CombinerError::NoDatasets);
        }
        validate_datasets(datasets)?;

        let mut titles = BTreeMap::new();
        let mut owners = BTreeMap::new();
        for dataset in datasets {
            for sample in &dataset.samples {
                let id = sample.sample_id.trim().to_string();
                if !sample.title.trim().is_empty() {
                    titles.insert(id.clone(), sample.title.clone());
                }
                owners.insert(id, dataset.id.trim().to_string());
            }
        }

        let prepared = datasets
            .iter()
            .map(|dataset| self.scorer.prepare_dataset(dataset))
            .collect::<Result<Vec<_>, _>>()?;
        let samples = prepared.iter().flatten().collect::<Vec<_>>();

        let distinct_datasets = prepared.iter().filter(|samples| !samples.is_empty()).count();
        if distinct_datasets <= 1 || !self.options.sample_matching {
            debug!(
                datasets = distinct_datasets,
                sample_matching = self.options.sample_matching,
                "each sample gets its own group"
            );
            let groups = samples
                .iter()
                .map(|sample| BTreeSet::from([sample.accession.to_string()]))
                .collect();
            return Ok(SampleCorrespondence::new(groups, titles, owners, Vec::new()));
        }

        let candidates = self.ranked_candidates(&prepared);
        debug!(candidates = candidates.len(), "scored candidate pairs");

        let index = samples
            .iter()
            .enumerate()
            .map(|(idx, sample)| (&sample.accession, idx))
            .collect::<HashMap<_, _>>();
        let dataset_index = datasets
            .iter()
            .enumerate()
            .map(|(idx, dataset)| (dataset.id.trim(), idx))
            .collect::<HashMap<_, _>>();
        let mut sets = DisjointSets::new(
            samples
                .iter()
                .map(|sample| dataset_index[sample.dataset_id.as_str()])
                .collect(),
        );

        let mut matches = Vec::new();
        for pair in candidates {
            let a = index[&pair.sample_a.accession];
            let b = index[&pair.sample_b.accession];
            if sets.try_union(a, b) {
                debug!(
                    sample_a = %pair.sample_a.accession,
                    sample_b = %pair.sample_b.accession,
                    score = pair.score,
                    "match"
                );
                matches.push(AcceptedMatch {
                    sample_a: pair.sample_a.accession.to_string(),
                    sample_b: pair.sample_b.accession.to_string(),
                    score: pair.score,
                });
            }
        }

        let mut groups = BTreeMap::<usize, BTreeSet<String>>::new();
        for (idx, sample) in samples.iter().enumerate() {
            groups
                .entry(sets.find(idx))
                .or_default()
                .insert(sample.accession.to_string());
        }

        let correspondence =
            SampleCorrespondence::new(groups.into_values().collect(), titles, owners, matches);
        debug!(
            groups = correspondence.len(),
            samples = correspondence.sample_count(),
            "correspondence resolved"
        );
        Ok(correspondence)
    }

    /// Legal cross-dataset pairs at or above the threshold, best first.
    fn ranked_candidates<'a>(&self, prepared: &'a [Vec<PreparedSample>]) -> Vec<CandidatePair<'a>> {
        let threshold = self.options.threshold();
        let mut candidates = Vec::new();
        for (i, left) in prepared.iter().enumerate() {
            for right in &prepared[i + 1..] {
                for a in left {
                    for b in right {
                        let Some(pair) = self.scorer.candidate(a, b) else {
                            continue;
                        };
                        if pair.score >= threshold {
                            candidates.push(ordered(pair));
                        }
                    }
                }
            }
        }

        if self.options.mode == MatchMode::Strict {
            candidates = drop_ambiguous(candidates);
        }

        candidates.sort_by(|x, y| {
            y.score
                .total_cmp(&x.score)
                .then_with(|| x.accession_gap().cmp(&y.accession_gap()))
                .then_with(|| x.sample_a.accession.cmp(&y.sample_a.accession))
                .then_with(|| x.sample_b.accession.cmp(&y.sample_b.accession))
        });
        candidates
    }
}

fn ordered(pair: CandidatePair<'_>) -> CandidatePair<'_> {
    if pair.sample_a.accession <= pair.sample_b.accession {
        pair
    } else {
        CandidatePair {
            sample_a: pair.sample_b,
            sample_b: pair.sample_a,
            score: pair.score,
        }
    }
}

/// Removes pairs whose sample has another candidate with the same score in
/// the same foreign dataset.
fn drop_ambiguous(candidates: Vec<CandidatePair<'_>>) -> Vec<CandidatePair<'_>> {
    let mut counts = HashMap::<(&SampleAccession, &str, u64), usize>::new();
    for pair in &candidates {
        let bits = pair.score.to_bits();
        *counts
            .entry((&pair.sample_a.accession, pair.sample_b.dataset_id.as_str(), bits))
            .or_default() += 1;
        *counts
            .entry((&pair.sample_b.accession, pair.sample_a.dataset_id.as_str(), bits))
            .or_default() += 1;
    }

    candidates
        .iter()
        .filter(|pair| {
            let bits = pair.score.to_bits();
            let tied = counts[&(&pair.sample_a.accession, pair.sample_b.dataset_id.as_str(), bits)]
                > 1
                || counts[&(&pair.sample_b.accession, pair.sample_a.dataset_id.as_str(), bits)] > 1;
            if tied {
                debug!(
                    sample_a = %pair.sample_a.accession,
                    sample_b = %pair.sample_b.accession,
                    score = pair.score,
                    "tied candidate dropped"
                );
            }
            !tied
        })
        .copied()
        .collect()
}

fn validate_datasets(datasets: &[SampleDataset]) -> Result<(), CombinerError> {
    let mut seen_datasets = BTreeSet::new();
    let mut seen_samples = BTreeSet::new();
    for dataset in datasets {
        let dataset_id: DatasetAccession = dataset.id.parse()?;
        if !seen_datasets.insert(dataset_id.clone()) {
            return Err(CombinerError::DuplicateDataset(dataset_id.to_string()));
        }
        if dataset.samples.is_empty() {
            warn!(dataset = %dataset_id, "dataset has no samples");
        }

        for sample in &dataset.samples {
            if sample.sample_id.trim().is_empty() {
                return Err(CombinerError::MissingSampleId {
                    dataset: dataset_id.to_string(),
                });
            }
            let accession: SampleAccession = sample.sample_id.parse()?;
            if sample.dataset_id.trim() != dataset_id.as_str() {
                return Err(CombinerError::DatasetMismatch {
                    sample: accession.to_string(),
                    claimed: sample.dataset_id.clone(),
                    dataset: dataset_id.to_string(),
                });
            }
            if !matches!(sample.channel_count, 1 | 2) {
                return Err(CombinerError::InvalidChannelCount {
                    sample: accession.to_string(),
                    count: sample.channel_count,
                });
            }
            if !sample.has_text() {
                warn!(sample = %accession, dataset = %dataset_id, "sample has no title or description");
            }
            if !seen_samples.insert(accession.clone()) {
                return Err(CombinerError::DuplicateSample {
                    sample: accession.to_string(),
                    dataset: dataset_id.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Union-find over sample indices that tracks which datasets each group spans.
struct DisjointSets {
    parent: Vec<usize>,
    datasets: Vec<BTreeSet<usize>>,
}

impl DisjointSets {
    fn new(sample_datasets: Vec<usize>) -> Self {
        Self {
            parent: (0..sample_datasets.len()).collect(),
            datasets: sample_datasets
                .into_iter()
                .map(|dataset| BTreeSet::from([dataset]))
                .collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Joins the groups of `a` and `b` unless they are already one group or
    /// share a dataset. Returns whether the join happened.
    fn try_union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b || !self.datasets[root_a].is_disjoint(&self.datasets[root_b]) {
            return false;
        }
        let (keep, absorb) = if self.datasets[root_a].len() >= self.datasets[root_b].len() {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        let absorbed = std::mem::take(&mut self.datasets[absorb]);
        self.datasets[keep].extend(absorbed);
        self.parent[absorb] = keep;
        true
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::SampleMetadata;

    fn dataset(id: &str, samples: &[(&str, &str)]) -> SampleDataset {
        SampleDataset::new(
            id,
            samples
                .iter()
                .map(|(acc, title)| SampleMetadata::new(*acc, id, *title))
                .collect(),
        )
    }

    #[test]
    fn disjoint_sets_refuse_same_dataset() {
        let mut sets = DisjointSets::new(vec![0, 1, 1]);
        assert!(sets.try_union(0, 1));
        assert!(!sets.try_union(0, 2));
        assert!(!sets.try_union(1, 0));
        assert_eq!(sets.find(0), sets.find(1));
        assert_ne!(sets.find(0), sets.find(2));
    }

    #[test]
    fn options_reject_bad_threshold() {
        let options = CombinerOptions {
            threshold: Some(0.0),
            ..CombinerOptions::default()
        };
        assert_matches!(
            DatasetCombiner::new(options),
            Err(CombinerError::InvalidThreshold(_))
        );
    }

    #[test]
    fn strict_mode_uses_higher_threshold() {
        assert_eq!(MatchMode::Strict.default_threshold(), 0.7);
        let combiner = DatasetCombiner::with_mode(MatchMode::Strict);
        assert_eq!(combiner.options().threshold(), 0.7);
    }

    #[test]
    fn tie_goes_to_closest_accession() {
        let datasets = vec![
            dataset("GDS1", &[("GSM12929", "liver")]),
            dataset("GDS2", &[("GSM12955", "liver"), ("GSM12945", "liver")]),
        ];
        let result = DatasetCombiner::default()
            .find_correspondence(&datasets)
            .unwrap();
        assert_eq!(
            result.corresponding_samples("GSM12929").unwrap(),
            BTreeSet::from(["GSM12945"])
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn strict_mode_leaves_ties_unmatched() {
        let datasets = vec![
            dataset("GDS1", &[("GSM12929", "liver")]),
            dataset("GDS2", &[("GSM12955", "liver"), ("GSM12945", "liver")]),
        ];
        let result = DatasetCombiner::with_mode(MatchMode::Strict)
            .find_correspondence(&datasets)
            .unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.matches().is_empty());
    }

    #[test]
    fn disabled_matching_gives_singletons() {
        let options = CombinerOptions {
            sample_matching: false,
            ..CombinerOptions::default()
        };
        let datasets = vec![
            dataset("GDS1", &[("GSM1", "liver")]),
            dataset("GDS2", &[("GSM2", "liver")]),
        ];
        let result = DatasetCombiner::new(options)
            .unwrap()
            .find_correspondence(&datasets)
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn duplicate_dataset_is_rejected() {
        let datasets = vec![
            dataset("GDS1", &[("GSM1", "liver")]),
            dataset("GDS1", &[("GSM2", "liver")]),
        ];
        let err = DatasetCombiner::default()
            .find_correspondence(&datasets)
            .unwrap_err();
        assert_matches!(err, CombinerError::DuplicateDataset(_));
    }
}
