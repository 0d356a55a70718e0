//! Screener configuration. Every section has a default so a missing or broken
//! config file still yields a runnable screener.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Data directory (encrypted result store)
    pub data_dir: PathBuf,
    /// Classifier artifacts
    pub model: ModelConfig,
    /// Feature extraction parameters
    pub features: FeaturesConfig,
    /// Heuristic/model blend and risk thresholds
    pub risk: RiskConfig,
    /// Local result persistence
    pub storage: StorageConfig,
    /// Optional remote results API
    pub uplink: UplinkConfig,
    /// Session files to score
    pub inbox: InboxConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX classifier exported with a `[1, n_features]` float input
    pub model_path: PathBuf,
    /// Optional standard scaler (JSON: `mean`, `scale`)
    pub scaler_path: Option<PathBuf>,
    /// Optional mean imputer (JSON: `statistics`)
    pub imputer_path: Option<PathBuf>,
    /// Info record: version, feature names, decision threshold
    pub metadata_path: PathBuf,
}

/// What to do with sessions longer than `round_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongSessionPolicy {
    /// Average into ~16 buckets and duplicate each bucket value.
    BucketAverage,
    /// Keep the first `round_count` rounds.
    Truncate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorConcentration {
    /// Shannon entropy of the misses distribution.
    Entropy,
    /// Largest per-round misses over total misses.
    MaxRatio,
}

/// Which derived-feature block the target model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedVariant {
    /// 9 derived features (205 total).
    Base,
    /// 9 derived features plus `initial_response_time` (206 total).
    WithResponseTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Rounds per metric after length normalization
    pub round_count: usize,
    pub long_session: LongSessionPolicy,
    pub error_concentration: ErrorConcentration,
    pub derived: DerivedVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Weight of the accuracy heuristic in the blend
    pub heuristic_weight: f64,
    /// Weight of the classifier score in the blend
    pub model_weight: f64,
    /// Probability at or above this is medium risk
    pub medium_threshold: f64,
    /// Probability at or above this is high risk
    pub high_threshold: f64,
    /// `prediction` is true above this probability
    pub decision_threshold: f64,
    /// Index of the risk class in `predict_proba` output
    pub positive_class: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    pub enabled: bool,
    /// Base URL of the results API when enabled
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Directory scanned for session `*.json` files
    pub dir: PathBuf,
    /// 0 runs a single pass; otherwise poll every N seconds until Ctrl+C
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("dyslexia-screen"))
            .unwrap_or_else(|| PathBuf::from(".dyslexia-screen"));
        Self {
            data_dir,
            model: ModelConfig::default(),
            features: FeaturesConfig::default(),
            risk: RiskConfig::default(),
            storage: StorageConfig::default(),
            uplink: UplinkConfig::default(),
            inbox: InboxConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/modelo_dislexia.onnx"),
            scaler_path: None,
            imputer_path: None,
            metadata_path: PathBuf::from("model/modelo_info.json"),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            round_count: 32,
            long_session: LongSessionPolicy::BucketAverage,
            error_concentration: ErrorConcentration::Entropy,
            derived: DerivedVariant::Base,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            heuristic_weight: 0.7,
            model_weight: 0.3,
            medium_threshold: 0.25,
            high_threshold: 0.60,
            decision_threshold: 0.50,
            positive_class: 1,
        }
    }
}

impl RiskConfig {
    /// Stricter thresholds used with the older model artifacts.
    pub fn legacy() -> Self {
        Self {
            medium_threshold: 0.30,
            high_threshold: 0.70,
            ..Self::default()
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_secs: 15,
        }
    }
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("inbox"),
            poll_interval_secs: 0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl ScreenerConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<ScreenerConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
