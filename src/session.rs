//! Wire payload of a finished screening session → profile + activity records.
//!
//! ```json
//! {
//!   "userId": "u-17", "childId": "c-3", "durationSeconds": 412,
//!   "user": {"gender": "Female", "age": 8, "native_lang": true, "other_lang": false},
//!   "activities": [
//!     {"name": "visual_discrimination",
//!      "rounds": [{"clicks": 10, "hits": 8, "misses": 2, "score": 8,
//!                  "accuracy": 0.8, "missrate": 0.2, "time": 4.1}]}
//!   ]
//! }
//! ```
//!
//! Missing or non-numeric round fields become 0 and are logged as
//! `MalformedRound`; only a missing `user` or `activities` rejects the payload.

use crate::error::{Result, ScreeningError};
use crate::features::{ActivityRecord, Gender, RoundRecord, SubjectProfile};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreeningSession {
    pub user_id: Option<String>,
    pub child_id: Option<String>,
    pub duration_seconds: Option<f64>,
    pub profile: SubjectProfile,
    pub activities: Vec<ActivityRecord>,
    /// Round fields replaced by defaults while parsing
    pub malformed_fields: usize,
}

impl ScreeningSession {
    pub fn from_json(data: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(data)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let user = value
            .get("user")
            .and_then(Value::as_object)
            .ok_or_else(|| ScreeningError::InvalidSession("field 'user' required".into()))?;
        let activities = value
            .get("activities")
            .and_then(Value::as_array)
            .ok_or_else(|| ScreeningError::InvalidSession("field 'activities' required".into()))?;

        let profile = SubjectProfile {
            gender: user
                .get("gender")
                .and_then(Value::as_str)
                .map(Gender::parse)
                .unwrap_or(Gender::Male),
            age: user
                .get("age")
                .and_then(Value::as_f64)
                .filter(|a| a.is_finite() && *a >= 0.0)
                .map(|a| a.round() as u32)
                .unwrap_or(8),
            native_lang: user.get("native_lang").and_then(Value::as_bool).unwrap_or(true),
            other_lang: user.get("other_lang").and_then(Value::as_bool).unwrap_or(false),
        };

        let mut session = ScreeningSession {
            user_id: string_field(value, "userId"),
            child_id: string_field(value, "childId"),
            duration_seconds: value.get("durationSeconds").and_then(Value::as_f64),
            profile,
            activities: Vec::with_capacity(activities.len()),
            malformed_fields: 0,
        };

        for (a_idx, activity) in activities.iter().enumerate() {
            let name = activity
                .get("name")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("activity_{}", a_idx + 1));
            let rounds = activity
                .get("rounds")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut parsed = Vec::with_capacity(rounds.len());
            for (r_idx, round) in rounds.iter().enumerate() {
                let mut reader = RoundReader {
                    round,
                    activity: &name,
                    index: r_idx + 1,
                    malformed: 0,
                };
                parsed.push(RoundRecord {
                    clicks: reader.count("clicks"),
                    hits: reader.count("hits"),
                    misses: reader.count("misses"),
                    score: reader.number("score"),
                    accuracy: reader.number("accuracy"),
                    missrate: reader.number("missrate"),
                    time: round.get("time").and_then(Value::as_f64).unwrap_or(0.0),
                });
                session.malformed_fields += reader.malformed;
            }
            session.activities.push(ActivityRecord {
                name,
                rounds: parsed,
            });
        }
        Ok(session)
    }

    pub fn round_total(&self) -> usize {
        self.activities.iter().map(|a| a.rounds.len()).sum()
    }

    /// Label used in logs and storage.
    pub fn label(&self) -> &str {
        self.child_id
            .as_deref()
            .or(self.user_id.as_deref())
            .unwrap_or("anonymous")
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

struct RoundReader<'a> {
    round: &'a Value,
    activity: &'a str,
    index: usize,
    malformed: usize,
}

impl RoundReader<'_> {
    fn number(&mut self, field: &str) -> f64 {
        match self.round.get(field).and_then(Value::as_f64) {
            Some(v) if v.is_finite() => v,
            _ => {
                self.recover(field);
                0.0
            }
        }
    }

    fn count(&mut self, field: &str) -> u32 {
        match self.round.get(field).and_then(Value::as_f64) {
            Some(v) if v.is_finite() && v >= 0.0 => v.round().min(u32::MAX as f64) as u32,
            _ => {
                self.recover(field);
                0
            }
        }
    }

    fn recover(&mut self, field: &str) {
        self.malformed += 1;
        let err = ScreeningError::MalformedRound {
            activity: self.activity.to_string(),
            round: self.index,
            field: field.to_string(),
        };
        tracing::warn!(error = %err, "round field defaulted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_payload() {
        let s = ScreeningSession::from_json(
            r#"{"userId":"u1","childId":7,"user":{"gender":"FEMALE","age":9,"native_lang":false,"other_lang":true},
                "activities":[{"name":"sound_letter","rounds":[
                  {"clicks":10,"hits":8,"misses":2,"score":8,"accuracy":0.8,"missrate":0.2,"time":3.5}]}]}"#,
        )
        .unwrap();
        assert_eq!(s.child_id.as_deref(), Some("7"));
        assert_eq!(s.profile.gender, Gender::Female);
        assert_eq!(s.profile.age, 9);
        assert!(!s.profile.native_lang && s.profile.other_lang);
        assert_eq!(s.activities[0].rounds[0].hits, 8);
        assert_eq!(s.activities[0].rounds[0].time, 3.5);
        assert_eq!(s.malformed_fields, 0);
        assert_eq!(s.label(), "7");
    }

    #[test]
    fn malformed_round_fields_default_to_zero() {
        let s = ScreeningSession::from_json(
            r#"{"user":{},"activities":[{"rounds":[{"clicks":"ten","hits":4,"misses":-1}]}]}"#,
        )
        .unwrap();
        let r = &s.activities[0].rounds[0];
        assert_eq!(r.clicks, 0);
        assert_eq!(r.hits, 4);
        assert_eq!(r.misses, 0);
        // clicks, misses, score, accuracy, missrate
        assert_eq!(s.malformed_fields, 5);
        assert_eq!(s.activities[0].name, "activity_1");
        assert_eq!(s.profile, SubjectProfile::default());
    }

    #[test]
    fn missing_sections_are_rejected() {
        assert!(matches!(
            ScreeningSession::from_json(r#"{"activities":[]}"#),
            Err(ScreeningError::InvalidSession(_))
        ));
        assert!(matches!(
            ScreeningSession::from_json(r#"{"user":{}}"#),
            Err(ScreeningError::InvalidSession(_))
        ));
    }
}
