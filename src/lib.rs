//! Dyslexia risk screening from mini-game round telemetry.
//!
//! Modular structure:
//! - [`features`] — Round aggregation, derived statistics, feature vector assembly
//! - [`model`] — Opaque classifier (ONNX) with imputer/scaler, loaded once
//! - [`risk`] — Heuristic + classifier blend and risk levels
//! - [`session`] — Wire payload parsing with malformed-round recovery
//! - [`screener`] — End-to-end orchestration
//! - [`storage`] — Encrypted local result store and background writer
//! - [`uplink`] — Optional results API reporter
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod risk;
pub mod screener;
pub mod session;
pub mod storage;
pub mod uplink;

pub use config::ScreenerConfig;
pub use error::ScreeningError;
pub use features::{FeatureExtractor, FeatureVector};
pub use logging::StructuredLogger;
pub use model::{Classifier, SharedModel};
pub use risk::{RiskAssessment, RiskEngine, RiskLevel};
pub use screener::Screener;
pub use session::ScreeningSession;
pub use storage::SecureStore;
