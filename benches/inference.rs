//! Scoring benchmark: assembled vector → heuristic + classifier blend.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dyslexia_screen::config::{FeaturesConfig, RiskConfig};
use dyslexia_screen::features::{
    ActivityRecord, FeatureExtractor, FeatureVector, RoundRecord, SubjectProfile,
};
use dyslexia_screen::model::Classifier;
use dyslexia_screen::risk::RiskEngine;

/// Logistic model over the mean of the accuracy columns.
struct AccuracyLogit;

impl Classifier for AccuracyLogit {
    fn predict_proba(&self, features: &FeatureVector) -> dyslexia_screen::error::Result<[f64; 2]> {
        let acc = features.round_series("Accuracy");
        let mean = acc.iter().sum::<f64>() / acc.len().max(1) as f64;
        let p = 1.0 / (1.0 + (8.0 * (mean - 0.7)).exp());
        Ok([1.0 - p, p])
    }

    fn feature_count(&self) -> usize {
        205
    }
}

fn vector() -> FeatureVector {
    let rounds = (0..32)
        .map(|i| RoundRecord {
            clicks: 10,
            hits: 5 + (i % 5),
            misses: 5 - (i % 5),
            score: (5 + (i % 5)) as f64,
            accuracy: (5 + (i % 5)) as f64 / 10.0,
            missrate: (5 - (i % 5)) as f64 / 10.0,
            time: 3.0,
        })
        .collect();
    let activities = vec![ActivityRecord {
        name: "bench".to_string(),
        rounds,
    }];
    FeatureExtractor::new(FeaturesConfig::default())
        .extract(&SubjectProfile::default(), &activities, 205)
        .unwrap()
        .vector
}

fn bench_score(c: &mut Criterion) {
    let engine = RiskEngine::new(RiskConfig::default());
    let fv = vector();
    c.bench_function("risk_score_205d", |b| {
        b.iter(|| engine.score(black_box(&fv), &AccuracyLogit).unwrap())
    });
}

fn bench_heuristic(c: &mut Criterion) {
    let engine = RiskEngine::new(RiskConfig::default());
    let fv = vector();
    c.bench_function("heuristic_only", |b| b.iter(|| engine.heuristic(black_box(&fv))));
}

criterion_group!(benches, bench_score, bench_heuristic);
criterion_main!(benches);
