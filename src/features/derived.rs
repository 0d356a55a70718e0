//! Summary statistics over the normalized round sequences.
//!
//! Non-finite accuracy entries count as missing wherever the formulas below
//! say "valid entries".

use super::{mean, MetricSequence};
use crate::config::{DerivedVariant, ErrorConcentration, FeaturesConfig};
use serde::{Deserialize, Serialize};

const CV_EPSILON: f64 = 1e-6;
const RATIO_EPSILON: f64 = 1e-8;
const LOG_EPSILON: f64 = 1e-10;
/// Rounds summed for `initial_response_time`
const RESPONSE_WINDOW: usize = 3;

const BASE_NAMES: [&str; 9] = [
    "accuracy_trend",
    "accuracy_mean_first_half",
    "accuracy_mean_second_half",
    "accuracy_improvement",
    "clicks_variability",
    "clicks_total",
    "global_accuracy",
    "error_concentration",
    "consistency_score",
];

const WITH_RESPONSE_TIME_NAMES: [&str; 10] = [
    "accuracy_trend",
    "accuracy_mean_first_half",
    "accuracy_mean_second_half",
    "accuracy_improvement",
    "clicks_variability",
    "clicks_total",
    "global_accuracy",
    "error_concentration",
    "consistency_score",
    "initial_response_time",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatures {
    /// Least-squares slope of accuracy over round index
    pub accuracy_trend: f64,
    pub accuracy_mean_first_half: f64,
    pub accuracy_mean_second_half: f64,
    pub accuracy_improvement: f64,
    /// Coefficient of variation of clicks
    pub clicks_variability: f64,
    pub clicks_total: f64,
    /// hits / (hits + misses)
    pub global_accuracy: f64,
    pub error_concentration: f64,
    /// 1 / (1 + cv(accuracy))
    pub consistency_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_response_time: Option<f64>,
}

impl DerivedFeatures {
    pub fn compute(seq: &MetricSequence, config: &FeaturesConfig) -> Self {
        let acc = &seq.accuracy;
        let half = acc.len() / 2;
        let first = valid_mean(&acc[..half]);
        let second = valid_mean(&acc[half..]);

        let total_hits: f64 = seq.hits.iter().sum();
        let total_misses: f64 = seq.misses.iter().sum();

        let error_concentration = match config.error_concentration {
            ErrorConcentration::Entropy => miss_entropy(&seq.misses),
            ErrorConcentration::MaxRatio => miss_max_ratio(&seq.misses),
        };

        let initial_response_time = match config.derived {
            DerivedVariant::Base => None,
            DerivedVariant::WithResponseTime => Some(
                seq.clicks.iter().take(RESPONSE_WINDOW).sum::<f64>() / 10.0,
            ),
        };

        Self {
            accuracy_trend: trend(acc),
            accuracy_mean_first_half: first,
            accuracy_mean_second_half: second,
            accuracy_improvement: second - first,
            clicks_variability: std_dev(&seq.clicks) / (mean(&seq.clicks) + CV_EPSILON),
            clicks_total: seq.clicks.iter().sum(),
            global_accuracy: total_hits / (total_hits + total_misses + RATIO_EPSILON),
            error_concentration,
            consistency_score: consistency(acc),
            initial_response_time,
        }
    }

    /// Feature names of a derived block, in model column order.
    pub fn names(variant: DerivedVariant) -> &'static [&'static str] {
        match variant {
            DerivedVariant::Base => &BASE_NAMES,
            DerivedVariant::WithResponseTime => &WITH_RESPONSE_TIME_NAMES,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "accuracy_trend" => Some(self.accuracy_trend),
            "accuracy_mean_first_half" => Some(self.accuracy_mean_first_half),
            "accuracy_mean_second_half" => Some(self.accuracy_mean_second_half),
            "accuracy_improvement" => Some(self.accuracy_improvement),
            "clicks_variability" => Some(self.clicks_variability),
            "clicks_total" => Some(self.clicks_total),
            "global_accuracy" => Some(self.global_accuracy),
            "error_concentration" => Some(self.error_concentration),
            "consistency_score" => Some(self.consistency_score),
            "initial_response_time" => self.initial_response_time,
            _ => None,
        }
    }
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn valid(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

fn valid_mean(values: &[f64]) -> f64 {
    mean(&valid(values))
}

/// Slope of the least-squares line through `(index, value)` for finite values.
fn trend(values: &[f64]) -> f64 {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| (i as f64, *v))
        .collect();
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (num, den) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
        (num + (x - mean_x) * (y - mean_y), den + (x - mean_x).powi(2))
    });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn miss_entropy(misses: &[f64]) -> f64 {
    let total: f64 = misses.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -misses
        .iter()
        .filter(|m| **m > 0.0)
        .map(|m| {
            let p = m / total;
            p * (p + LOG_EPSILON).ln()
        })
        .sum::<f64>()
}

fn miss_max_ratio(misses: &[f64]) -> f64 {
    let total: f64 = misses.iter().sum();
    let max = misses.iter().copied().fold(0.0, f64::max);
    max / (total + RATIO_EPSILON)
}

fn consistency(accuracy: &[f64]) -> f64 {
    let values = valid(accuracy);
    let m = mean(&values);
    if values.len() < 2 || m == 0.0 {
        return 0.5;
    }
    if values.iter().all(|v| *v == values[0]) {
        return 1.0;
    }
    1.0 / (1.0 + std_dev(&values) / m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_with_accuracy(acc: Vec<f64>) -> MetricSequence {
        let n = acc.len();
        MetricSequence {
            clicks: vec![10.0; n],
            hits: vec![5.0; n],
            misses: vec![5.0; n],
            score: vec![5.0; n],
            accuracy: acc,
            missrate: vec![0.5; n],
        }
    }

    #[test]
    fn trend_sign_follows_direction() {
        let cfg = FeaturesConfig::default();
        let flat = DerivedFeatures::compute(&seq_with_accuracy(vec![0.6; 32]), &cfg);
        assert_eq!(flat.accuracy_trend, 0.0);

        let up: Vec<f64> = (0..32).map(|i| i as f64 / 32.0).collect();
        assert!(DerivedFeatures::compute(&seq_with_accuracy(up), &cfg).accuracy_trend > 0.0);

        let down: Vec<f64> = (0..32).map(|i| 1.0 - i as f64 / 32.0).collect();
        assert!(DerivedFeatures::compute(&seq_with_accuracy(down), &cfg).accuracy_trend < 0.0);
    }

    #[test]
    fn trend_of_linear_series_is_its_slope() {
        let values: Vec<f64> = (0..32).map(|i| 0.1 + 0.01 * i as f64).collect();
        assert!((trend(&values) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn trend_skips_missing_points() {
        let values = vec![f64::NAN, 0.5];
        assert_eq!(trend(&values), 0.0);
    }

    #[test]
    fn halves_and_improvement() {
        let mut acc = vec![0.4; 16];
        acc.extend(vec![0.8; 16]);
        let d = DerivedFeatures::compute(&seq_with_accuracy(acc), &FeaturesConfig::default());
        assert!((d.accuracy_mean_first_half - 0.4).abs() < 1e-12);
        assert!((d.accuracy_mean_second_half - 0.8).abs() < 1e-12);
        assert!((d.accuracy_improvement - 0.4).abs() < 1e-12);
    }

    #[test]
    fn global_accuracy_is_half_when_hits_equal_misses() {
        let d = DerivedFeatures::compute(&seq_with_accuracy(vec![0.5; 32]), &FeaturesConfig::default());
        assert!((d.global_accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn constant_clicks_have_zero_variability() {
        let d = DerivedFeatures::compute(&seq_with_accuracy(vec![0.5; 32]), &FeaturesConfig::default());
        assert_eq!(d.clicks_variability, 0.0);
        assert_eq!(d.clicks_total, 320.0);
    }

    #[test]
    fn consistency_is_one_only_for_identical_accuracy() {
        for acc in [0.3, 0.6, 0.7, 0.8, 0.9] {
            assert_eq!(consistency(&[acc; 32]), 1.0);
        }
        assert!(consistency(&[0.7, 0.8, 0.7, 0.8]) < 1.0);
        assert_eq!(consistency(&[0.0; 32]), 0.5);
        assert_eq!(consistency(&[0.9]), 0.5);
    }

    #[test]
    fn entropy_of_uniform_misses_is_ln_n() {
        let misses = vec![2.0; 32];
        assert!((miss_entropy(&misses) - (32f64).ln()).abs() < 1e-6);
        assert_eq!(miss_entropy(&[0.0; 32]), 0.0);
        // single concentrated round carries no entropy
        let mut one = vec![0.0; 32];
        one[4] = 9.0;
        assert!(miss_entropy(&one).abs() < 1e-6);
    }

    #[test]
    fn max_ratio_variant() {
        let cfg = FeaturesConfig {
            error_concentration: ErrorConcentration::MaxRatio,
            ..FeaturesConfig::default()
        };
        let mut seq = seq_with_accuracy(vec![0.5; 4]);
        seq.misses = vec![1.0, 3.0, 0.0, 0.0];
        let d = DerivedFeatures::compute(&seq, &cfg);
        assert!((d.error_concentration - 0.75).abs() < 1e-6);
    }

    #[test]
    fn response_time_only_in_extended_variant() {
        let mut seq = seq_with_accuracy(vec![0.5; 32]);
        seq.clicks[0] = 4.0;
        seq.clicks[1] = 6.0;
        seq.clicks[2] = 5.0;
        let base = DerivedFeatures::compute(&seq, &FeaturesConfig::default());
        assert!(base.initial_response_time.is_none());
        let cfg = FeaturesConfig {
            derived: DerivedVariant::WithResponseTime,
            ..FeaturesConfig::default()
        };
        let ext = DerivedFeatures::compute(&seq, &cfg);
        assert_eq!(ext.initial_response_time, Some(1.5));
        assert_eq!(DerivedFeatures::names(cfg.derived).len(), 10);
    }
}
