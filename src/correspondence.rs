use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cross-dataset pair accepted by the combiner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedMatch {
    pub sample_a: String,
    pub sample_b: String,
    pub score: f64,
}

/// Partition of samples into groups of the same biological material.
///
/// Groups are ordered by their smallest sample id and a group's id is its
/// position in that order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleCorrespondence {
    groups: Vec<BTreeSet<String>>,
    #[serde(skip)]
    sample_to_group: BTreeMap<String, GroupId>,
    #[serde(skip)]
    titles: BTreeMap<String, String>,
    #[serde(skip)]
    datasets: BTreeMap<String, String>,
    matches: Vec<AcceptedMatch>,
}

impl SampleCorrespondence {
    pub(crate) fn new(
        groups: Vec<BTreeSet<String>>,
        titles: BTreeMap<String, String>,
        datasets: BTreeMap<String, String>,
        matches: Vec<AcceptedMatch>,
    ) -> Self {
        let mut groups = groups
            .into_iter()
            .filter(|group| !group.is_empty())
            .collect::<Vec<_>>();
        groups.sort_by(|a, b| a.first().cmp(&b.first()));

        let sample_to_group = groups
            .iter()
            .enumerate()
            .flat_map(|(idx, group)| {
                group
                    .iter()
                    .map(move |sample| (sample.clone(), GroupId(idx)))
            })
            .collect();

        Self {
            groups,
            sample_to_group,
            titles,
            datasets,
            matches,
        }
    }

    /// Samples in the same group as `sample_id`, not including `sample_id` itself.
    /// `None` if the sample was not part of the input.
    pub fn corresponding_samples(&self, sample_id: &str) -> Option<BTreeSet<&str>> {
        let group = self.group_of(sample_id)?;
        Some(
            self.groups[group.0]
                .iter()
                .map(String::as_str)
                .filter(|other| *other != sample_id)
                .collect(),
        )
    }

    pub fn group_of(&self, sample_id: &str) -> Option<GroupId> {
        self.sample_to_group.get(sample_id).copied()
    }

    pub fn group(&self, id: GroupId) -> Option<&BTreeSet<String>> {
        self.groups.get(id.0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BTreeSet<String>> {
        self.groups.iter()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.sample_to_group.len()
    }

    pub fn title(&self, sample_id: &str) -> Option<&str> {
        self.titles.get(sample_id).map(String::as_str)
    }

    pub fn dataset_of(&self, sample_id: &str) -> Option<&str> {
        self.datasets.get(sample_id).map(String::as_str)
    }

    pub fn matches(&self) -> &[AcceptedMatch] {
        &self.matches
    }
}

impl<'a> IntoIterator for &'a SampleCorrespondence {
    type Item = &'a BTreeSet<String>;
    type IntoIter = std::slice::Iter<'a, BTreeSet<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for SampleCorrespondence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, group) in self.groups.iter().enumerate() {
            write!(f, "{idx}:")?;
            for sample in group {
                write!(f, " {sample}")?;
                if let Some(dataset) = self.dataset_of(sample) {
                    write!(f, " ({dataset})")?;
                }
                if let Some(title) = self.title(sample) {
                    write!(f, " \"{title}\"")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
