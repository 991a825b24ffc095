use std::io::{self, Write};

use serde::Serialize;

use crate::correspondence::{AcceptedMatch, SampleCorrespondence};

#[derive(Debug, Clone, Serialize)]
pub struct CorrespondenceReport {
    pub group_count: usize,
    pub sample_count: usize,
    pub groups: Vec<GroupReport>,
    pub matches: Vec<AcceptedMatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub id: usize,
    pub samples: Vec<SampleReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    pub sample_id: String,
    pub dataset_id: Option<String>,
    pub title: Option<String>,
}

impl CorrespondenceReport {
    pub fn from_correspondence(correspondence: &SampleCorrespondence) -> Self {
        let groups = correspondence
            .iter()
            .enumerate()
            .map(|(id, group)| GroupReport {
                id,
                samples: group
                    .iter()
                    .map(|sample| SampleReport {
                        sample_id: sample.clone(),
                        dataset_id: correspondence.dataset_of(sample).map(str::to_string),
                        title: correspondence.title(sample).map(str::to_string),
                    })
                    .collect(),
            })
            .collect();

        Self {
            group_count: correspondence.len(),
            sample_count: correspondence.sample_count(),
            groups,
            matches: correspondence.matches().to_vec(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_correspondence(correspondence: &SampleCorrespondence) -> io::Result<()> {
        Self::print_json(&CorrespondenceReport::from_correspondence(correspondence))
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_correspondence(correspondence: &SampleCorrespondence) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(
            stdout,
            "{} samples in {} groups ({} matches)",
            correspondence.sample_count(),
            correspondence.len(),
            correspondence.matches().len()
        )?;
        write!(stdout, "{correspondence}")?;
        Ok(())
    }
}
