//! Round aggregation: activities → six metric sequences of exactly `round_count` entries.

use super::{mean, ActivityRecord, MetricSequence};
use crate::config::{FeaturesConfig, LongSessionPolicy};

#[derive(Debug, Clone)]
pub struct RoundAggregator {
    round_count: usize,
    policy: LongSessionPolicy,
}

impl RoundAggregator {
    pub fn new(config: &FeaturesConfig) -> Self {
        Self {
            round_count: config.round_count.max(1),
            policy: config.long_session,
        }
    }

    pub fn round_count(&self) -> usize {
        self.round_count
    }

    /// Concatenate rounds across activities in list order, then normalize length.
    /// Never fails: missing rounds are synthesized from the fill rules.
    pub fn aggregate(&self, activities: &[ActivityRecord]) -> MetricSequence {
        let mut seq = MetricSequence::default();
        for activity in activities {
            for round in &activity.rounds {
                seq.push(&round.normalized());
            }
        }
        let supplied = seq.len();
        let out = self.normalize_length(&seq);
        tracing::debug!(
            activities = activities.len(),
            supplied,
            rounds = out.len(),
            "rounds aggregated"
        );
        out
    }

    /// Apply the length policy to every column. A sequence already at
    /// `round_count` comes back unchanged.
    pub fn normalize_length(&self, seq: &MetricSequence) -> MetricSequence {
        let n = seq.len();
        if n == self.round_count {
            return seq.clone();
        }
        if n < self.round_count {
            return seq.map_columns(|col| fill_with_mean(col, self.round_count));
        }
        match self.policy {
            LongSessionPolicy::BucketAverage => {
                seq.map_columns(|col| bucket_average(col, self.round_count))
            }
            LongSessionPolicy::Truncate => seq.map_columns(|col| col[..self.round_count].to_vec()),
        }
    }
}

fn fill_with_mean(values: &[f64], target: usize) -> Vec<f64> {
    let fill = mean(values);
    let mut out = values.to_vec();
    out.resize(target, fill);
    out
}

/// Average contiguous buckets of `ceil(n / (target/2))` values, emit each
/// bucket mean twice, then cut or pad (with the last value) to `target`.
fn bucket_average(values: &[f64], target: usize) -> Vec<f64> {
    let buckets = (target / 2).max(1);
    let size = values.len().div_ceil(buckets).max(1);
    let mut out: Vec<f64> = values
        .chunks(size)
        .map(mean)
        .flat_map(|m| [m, m])
        .collect();
    out.truncate(target);
    let last = out.last().copied().unwrap_or(0.0);
    out.resize(target, last);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::RoundRecord;

    fn activity(rounds: Vec<RoundRecord>) -> ActivityRecord {
        ActivityRecord {
            name: "visual_discrimination".into(),
            rounds,
        }
    }

    fn round(clicks: u32, hits: u32, misses: u32, accuracy: f64) -> RoundRecord {
        RoundRecord {
            clicks,
            hits,
            misses,
            score: hits as f64,
            accuracy,
            missrate: misses as f64 / clicks.max(1) as f64,
            time: 3.0,
        }
    }

    #[test]
    fn short_session_filled_with_mean_not_zero() {
        let agg = RoundAggregator::new(&FeaturesConfig::default());
        let rounds = vec![round(10, 8, 2, 0.8), round(10, 6, 4, 0.6)];
        let seq = agg.aggregate(&[activity(rounds)]);
        assert_eq!(seq.len(), 32);
        assert_eq!(seq.clicks[31], 10.0);
        assert!((seq.hits[2] - 7.0).abs() < 1e-12);
        assert!((seq.accuracy[20] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn empty_session_fills_zero() {
        let agg = RoundAggregator::new(&FeaturesConfig::default());
        let seq = agg.aggregate(&[]);
        assert_eq!(seq.len(), 32);
        assert!(seq.columns().iter().all(|c| c.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn forty_eight_rounds_average_in_threes() {
        let agg = RoundAggregator::new(&FeaturesConfig::default());
        let rounds: Vec<RoundRecord> = (0..48).map(|i| round(i, 0, 0, 0.5)).collect();
        let seq = agg.aggregate(&[activity(rounds)]);
        assert_eq!(seq.len(), 32);
        // buckets {0,1,2}, {3,4,5}, ... each emitted twice
        assert_eq!(seq.clicks[0], 1.0);
        assert_eq!(seq.clicks[1], 1.0);
        assert_eq!(seq.clicks[2], 4.0);
        assert_eq!(seq.clicks[31], 46.0);
    }

    #[test]
    fn uneven_long_session_pads_with_last_bucket() {
        let agg = RoundAggregator::new(&FeaturesConfig::default());
        // 40 rounds -> bucket size 3 -> 14 buckets -> 28 values, padded to 32
        let rounds: Vec<RoundRecord> = (0..40).map(|i| round(i, 0, 0, 0.5)).collect();
        let seq = agg.aggregate(&[activity(rounds)]);
        assert_eq!(seq.len(), 32);
        assert_eq!(seq.clicks[27], 39.0);
        assert_eq!(seq.clicks[31], 39.0);
    }

    #[test]
    fn truncate_policy_keeps_first_rounds() {
        let config = FeaturesConfig {
            long_session: LongSessionPolicy::Truncate,
            ..FeaturesConfig::default()
        };
        let agg = RoundAggregator::new(&config);
        let rounds: Vec<RoundRecord> = (0..40).map(|i| round(i, 0, 0, 0.5)).collect();
        let seq = agg.aggregate(&[activity(rounds)]);
        assert_eq!(seq.clicks, (0..32).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn length_normalization_is_idempotent() {
        let agg = RoundAggregator::new(&FeaturesConfig::default());
        let rounds: Vec<RoundRecord> = (0..50).map(|i| round(i % 7, 1, 2, 0.3)).collect();
        let once = agg.aggregate(&[activity(rounds)]);
        let twice = agg.normalize_length(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn activities_concatenate_in_order() {
        let agg = RoundAggregator::new(&FeaturesConfig::default());
        let a = activity(vec![round(1, 1, 0, 1.0)]);
        let b = activity(vec![round(2, 2, 0, 1.0)]);
        let seq = agg.aggregate(&[a, b]);
        assert_eq!(&seq.clicks[..2], &[1.0, 2.0]);
    }

    #[test]
    fn out_of_range_accuracy_is_recomputed() {
        let agg = RoundAggregator::new(&FeaturesConfig::default());
        let mut r = round(10, 7, 3, 70.0);
        r.missrate = -0.2;
        let seq = agg.aggregate(&[activity(vec![r])]);
        assert!((seq.accuracy[0] - 0.7).abs() < 1e-12);
        assert_eq!(seq.missrate[0], 0.0);
    }
}
