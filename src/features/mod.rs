//! Feature extraction from mini-game round telemetry.
//!
//! Rounds from every activity are concatenated into six metric sequences,
//! length-normalized, summarized into derived statistics and assembled into
//! the ordered vector the classifier was trained on.

mod aggregate;
mod assemble;
mod derived;
mod pipeline;

pub use aggregate::RoundAggregator;
pub use assemble::{feature_names, FeatureAssembler};
pub use derived::DerivedFeatures;
pub use pipeline::{Extraction, FeatureExtractor};

use serde::{Deserialize, Serialize};

/// Column prefixes of the per-round block, in vector order.
pub const ROUND_METRICS: [&str; 6] = ["Clicks", "Hits", "Misses", "Score", "Accuracy", "Missrate"];

pub const DEMOGRAPHIC_FEATURES: [&str; 4] = ["Gender", "Nativelang", "Otherlang", "Age"];

const MEAN_PRECISION: f64 = 1e9;

/// Arithmetic mean, 0 for an empty slice. Constant input returns the common
/// value exactly; otherwise the result is rounded to 1e-9 so summation drift
/// never moves a mean across a bucket edge.
pub(crate) fn mean(values: &[f64]) -> f64 {
    let Some(first) = values.first() else {
        return 0.0;
    };
    if values.iter().all(|v| v == first) {
        return *first;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    (m * MEAN_PRECISION).round() / MEAN_PRECISION
}

/// One completed trial of a mini-game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub clicks: u32,
    pub hits: u32,
    pub misses: u32,
    pub score: f64,
    pub accuracy: f64,
    pub missrate: f64,
    /// Seconds spent in the round
    pub time: f64,
}

impl RoundRecord {
    /// Bring accuracy/missrate into [0, 1]. Values above 1 are recomputed from
    /// hits (misses) over clicks; non-finite score and time fall back to 0.
    pub fn normalized(&self) -> Self {
        Self {
            accuracy: unit_ratio(self.accuracy, self.hits, self.clicks),
            missrate: unit_ratio(self.missrate, self.misses, self.clicks),
            score: finite_or_zero(self.score),
            time: finite_or_zero(self.time).max(0.0),
            ..self.clone()
        }
    }
}

fn unit_ratio(value: f64, count: u32, clicks: u32) -> f64 {
    if value.is_nan() {
        0.0
    } else if value > 1.0 {
        if clicks > 0 {
            (count as f64 / clicks as f64).clamp(0.0, 1.0)
        } else {
            1.0
        }
    } else if value < 0.0 {
        0.0
    } else {
        value
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// A named mini-game session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub name: String,
    pub rounds: Vec<RoundRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Case-insensitive "male" is `Male`; anything else is `Female`.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("male") {
            Gender::Male
        } else {
            Gender::Female
        }
    }
}

/// Demographic context for one screened child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub gender: Gender,
    pub age: u32,
    pub native_lang: bool,
    pub other_lang: bool,
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            gender: Gender::Male,
            age: 8,
            native_lang: true,
            other_lang: false,
        }
    }
}

/// Six parallel per-round sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSequence {
    pub clicks: Vec<f64>,
    pub hits: Vec<f64>,
    pub misses: Vec<f64>,
    pub score: Vec<f64>,
    pub accuracy: Vec<f64>,
    pub missrate: Vec<f64>,
}

impl MetricSequence {
    pub fn push(&mut self, round: &RoundRecord) {
        self.clicks.push(round.clicks as f64);
        self.hits.push(round.hits as f64);
        self.misses.push(round.misses as f64);
        self.score.push(round.score);
        self.accuracy.push(round.accuracy);
        self.missrate.push(round.missrate);
    }

    /// Rounds held; all six sequences always share this length.
    pub fn len(&self) -> usize {
        self.clicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty()
    }

    /// Columns in `ROUND_METRICS` order.
    pub fn columns(&self) -> [&[f64]; 6] {
        [
            &self.clicks,
            &self.hits,
            &self.misses,
            &self.score,
            &self.accuracy,
            &self.missrate,
        ]
    }

    pub fn map_columns(&self, f: impl Fn(&[f64]) -> Vec<f64>) -> Self {
        Self {
            clicks: f(&self.clicks),
            hits: f(&self.hits),
            misses: f(&self.misses),
            score: f(&self.score),
            accuracy: f(&self.accuracy),
            missrate: f(&self.missrate),
        }
    }
}

/// Ordered named scalars in the classifier's column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Values of a per-round column (`Accuracy1`, `Accuracy2`, ...) in round order.
    pub fn round_series(&self, metric: &str) -> Vec<f64> {
        let mut indexed: Vec<(usize, f64)> = self
            .names
            .iter()
            .zip(&self.values)
            .filter_map(|(name, v)| {
                let suffix = name.strip_prefix(metric)?;
                suffix.parse::<usize>().ok().map(|round| (round, *v))
            })
            .collect();
        indexed.sort_by_key(|(round, _)| *round);
        indexed.into_iter().map(|(_, v)| v).collect()
    }
}
