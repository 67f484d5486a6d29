//! # Trajectories
//!
//! Precomputed sample sequences loaded from headerless CSV.
//!
//! ## Responsibilities
//! - **CSV Parsing**: Text rows split on newline and comma, kept as text.
//! - **Coercion**: `Trajectory::from_table` turns rows into positions plus
//!   trailing scalar fields (affine time, azimuth, crossing flag, ...).
//! - **Padding**: Lays out several trajectories back to back so they can be
//!   iterated in lockstep.

use crate::errors::{ReelError, ReelResult};
use glam::Vec3;
use std::sync::Arc;

/// Raw CSV rows with no numeric coercion applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsvTable {
    pub source: String,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parses headerless CSV text. Rows may have differing field counts.
    pub fn parse(source: &str, text: &str) -> ReelResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.trim().as_bytes());

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ReelError::Parse {
                path: source.to_string(),
                line: line + 1,
                message: e.to_string(),
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            source: source.to_string(),
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub position: Vec3,
    pub extras: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        Self {
            samples: points
                .into_iter()
                .map(|position| Sample {
                    position,
                    extras: Vec::new(),
                })
                .collect(),
        }
    }

    /// Converts a table to samples. Every row needs at least `x,y,z`.
    pub fn from_table(table: &CsvTable) -> ReelResult<Self> {
        let mut samples = Vec::with_capacity(table.len());

        for (idx, row) in table.rows.iter().enumerate() {
            let parse_err = |message: String| ReelError::Parse {
                path: table.source.clone(),
                line: idx + 1,
                message,
            };

            if row.len() < 3 {
                return Err(parse_err(format!("expected x,y,z but found {} fields", row.len())));
            }

            let values = row
                .iter()
                .map(|field| {
                    field
                        .parse::<f64>()
                        .map_err(|e| parse_err(format!("'{}': {}", field, e)))
                })
                .collect::<ReelResult<Vec<f64>>>()?;

            samples.push(Sample {
                position: Vec3::new(values[0] as f32, values[1] as f32, values[2] as f32),
                extras: values[3..].to_vec(),
            });
        }

        if samples.is_empty() {
            return Err(ReelError::Parse {
                path: table.source.clone(),
                line: 0,
                message: "trajectory has no samples".to_string(),
            });
        }

        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample(&self, index: usize) -> ReelResult<&Sample> {
        self.samples.get(index).ok_or(ReelError::IndexOutOfRange {
            index,
            len: self.samples.len(),
        })
    }

    pub fn position(&self, index: usize) -> ReelResult<Vec3> {
        self.sample(index).map(|s| s.position)
    }

    /// Pads trajectory `index` of a group so that all of them have the
    /// combined length and play one after the other.
    ///
    /// The front gets copies of the first sample for every sample of the
    /// preceding trajectories, the back copies of the last sample for the
    /// following ones.
    pub fn padded(&self, index: usize, lengths: &[usize]) -> Self {
        let before: usize = lengths[..index].iter().sum();
        let after: usize = lengths[index + 1..].iter().sum();

        let mut samples = Vec::with_capacity(before + self.len() + after);
        if let (Some(first), Some(last)) = (self.samples.first(), self.samples.last()) {
            samples.extend(std::iter::repeat(first.clone()).take(before));
            samples.extend(self.samples.iter().cloned());
            samples.extend(std::iter::repeat(last.clone()).take(after));
        }
        Self { samples }
    }
}

/// Applies [`Trajectory::padded`] across a group.
pub fn pad_sequential(trajectories: &[Arc<Trajectory>]) -> Vec<Arc<Trajectory>> {
    let lengths: Vec<usize> = trajectories.iter().map(|t| t.len()).collect();
    trajectories
        .iter()
        .enumerate()
        .map(|(i, t)| Arc::new(t.padded(i, &lengths)))
        .collect()
}

/// Cumulative end index of each trajectory in a padded group.
///
/// Trajectory `i` finishes its own samples at `crossing_indices[i]`.
pub fn crossing_indices(lengths: &[usize]) -> Vec<usize> {
    lengths
        .iter()
        .scan(0, |acc, &len| {
            *acc += len;
            Some(*acc)
        })
        .collect()
}
