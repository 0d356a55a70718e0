//! Uplink client: report finished screening results to a results API.

use crate::config::UplinkConfig;
use crate::storage::{subject_hash, StoredResult};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::info;

fn ts_iso(ms: i64) -> String {
    let dt = Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now);
    dt.to_rfc3339()
}

/// Summary only; round detail stays in the local store.
#[derive(Serialize)]
struct ResultPayload<'a> {
    id: &'a str,
    subject_hash: String,
    ts: String,
    probability: f64,
    confidence: f64,
    risk_level: &'a str,
    has_indicators: bool,
    model_version: &'a str,
    total_rounds: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f64>,
    payload_hash: String,
}

pub struct UplinkClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl UplinkClient {
    /// None when disabled, without endpoint, or if the HTTP client cannot be built.
    pub fn new(config: &UplinkConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let endpoint = config.endpoint.as_ref()?.trim_end_matches('/');
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .ok()?;
        Some(Self {
            client,
            base_url: endpoint.to_string(),
        })
    }

    fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), String> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().unwrap_or_default();
            return Err(format!("{} {}", status, text));
        }
        Ok(())
    }

    pub fn report(&self, result: &StoredResult) -> Result<(), String> {
        let payload = ResultPayload::from_result(result)?;
        self.post("/api/results", &payload)?;
        info!(result_id = %payload.id, level = payload.risk_level, "uplink result reported");
        Ok(())
    }
}

impl<'a> ResultPayload<'a> {
    fn from_result(result: &'a StoredResult) -> Result<Self, String> {
        let full = serde_json::to_vec(result).map_err(|e| e.to_string())?;
        let payload_hash: String = Sha256::digest(&full)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        let a = &result.assessment;
        Ok(Self {
            id: &a.id,
            subject_hash: subject_hash(result.subject()),
            ts: ts_iso(a.ts),
            probability: a.probability_dyslexia,
            confidence: a.confidence,
            risk_level: a.risk_level.as_str(),
            has_indicators: a.has_indicators,
            model_version: &a.model_version,
            total_rounds: result.rounds.len(),
            duration_seconds: result.duration_seconds,
            payload_hash,
        })
    }
}
