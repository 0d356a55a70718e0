//! Pipeline benchmark: activities → aggregated sequences → feature vector.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dyslexia_screen::config::FeaturesConfig;
use dyslexia_screen::features::{ActivityRecord, FeatureExtractor, RoundRecord, SubjectProfile};
use dyslexia_screen::session::ScreeningSession;

fn make_activities(rounds_per_activity: usize) -> Vec<ActivityRecord> {
    ["visual_discrimination", "sound_letter", "sequential_memory", "audio_dictation"]
        .iter()
        .map(|name| ActivityRecord {
            name: name.to_string(),
            rounds: (0..rounds_per_activity)
                .map(|i| RoundRecord {
                    clicks: 8 + (i % 4) as u32,
                    hits: 6 + (i % 3) as u32,
                    misses: 2,
                    score: 6.0,
                    accuracy: 0.75,
                    missrate: 0.25,
                    time: 4.0,
                })
                .collect(),
        })
        .collect()
}

fn bench_feature_extraction(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let profile = SubjectProfile::default();

    let mut g = c.benchmark_group("extract_by_rounds");
    for per_activity in [2, 8, 12, 30] {
        let activities = make_activities(per_activity);
        g.bench_function(format!("rounds_{}", per_activity * 4).as_str(), |b| {
            b.iter(|| extractor.extract(&profile, black_box(&activities), 205).unwrap())
        });
    }
    g.finish();
}

fn bench_session_parse(c: &mut Criterion) {
    let activities = make_activities(12);
    let payload = serde_json::json!({
        "userId": "bench",
        "user": {"gender": "Male", "age": 8, "native_lang": true, "other_lang": false},
        "activities": activities,
    })
    .to_string();

    c.bench_function("session_parse_48_rounds", |b| {
        b.iter(|| ScreeningSession::from_json(black_box(&payload)).unwrap())
    });
}

criterion_group!(benches, bench_feature_extraction, bench_session_parse);
criterion_main!(benches);
