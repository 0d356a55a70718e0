//! Result persistence: encrypted local store and a background writer that
//! keeps storage and uplink off the scoring path.

mod encrypted;
mod writer;

pub use encrypted::SecureStore;
pub use writer::ResultWriter;

use crate::features::SubjectProfile;
use crate::risk::RiskAssessment;
use crate::session::ScreeningSession;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of a subject identifier; identifiers never hit disk in clear.
pub fn subject_hash(subject: &str) -> String {
    Sha256::digest(subject.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundDetail {
    /// 1-based across the whole session
    pub round_number: usize,
    pub activity: String,
    pub clicks: u32,
    pub hits: u32,
    pub misses: u32,
    pub score: f64,
    pub time_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundTotals {
    pub clicks: u64,
    pub hits: u64,
    pub misses: u64,
}

/// A finished assessment with the session detail it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    pub assessment: RiskAssessment,
    pub user_id: Option<String>,
    pub child_id: Option<String>,
    pub duration_seconds: Option<f64>,
    pub profile: SubjectProfile,
    pub activities: Vec<String>,
    pub rounds: Vec<RoundDetail>,
    pub totals: RoundTotals,
    pub features_extracted: usize,
}

impl StoredResult {
    pub fn new(session: &ScreeningSession, assessment: &RiskAssessment, features_extracted: usize) -> Self {
        let mut rounds = Vec::with_capacity(session.round_total());
        let mut totals = RoundTotals::default();
        for activity in &session.activities {
            for r in &activity.rounds {
                totals.clicks += r.clicks as u64;
                totals.hits += r.hits as u64;
                totals.misses += r.misses as u64;
                rounds.push(RoundDetail {
                    round_number: rounds.len() + 1,
                    activity: activity.name.clone(),
                    clicks: r.clicks,
                    hits: r.hits,
                    misses: r.misses,
                    score: r.score,
                    time_seconds: r.time,
                });
            }
        }
        Self {
            assessment: assessment.clone(),
            user_id: session.user_id.clone(),
            child_id: session.child_id.clone(),
            duration_seconds: session.duration_seconds,
            profile: session.profile.clone(),
            activities: session.activities.iter().map(|a| a.name.clone()).collect(),
            rounds,
            totals,
            features_extracted,
        }
    }

    /// Identifier results are grouped by: child, else user, else "anonymous".
    pub fn subject(&self) -> &str {
        self.child_id
            .as_deref()
            .or(self.user_id.as_deref())
            .unwrap_or("anonymous")
    }
}
