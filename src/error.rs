//! Error taxonomy for extraction, inference, and scoring.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreeningError {
    /// Assembled vector length differs from what the loaded model declares.
    #[error("feature schema mismatch: model expects {expected} features, assembled {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    /// The model was trained on a column the assembled vector does not carry.
    #[error("feature schema mismatch: model column '{0}' missing from assembled vector")]
    MissingColumn(String),

    /// Classifier, scaler or imputer failed to load, or inference failed.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// A round was missing a numeric field; recovered by substituting a default.
    #[error("malformed round {round} in activity '{activity}': field '{field}' replaced by default")]
    MalformedRound {
        activity: String,
        round: usize,
        field: String,
    },

    #[error("invalid session payload: {0}")]
    InvalidSession(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for ScreeningError {
    fn from(e: rusqlite::Error) -> Self {
        ScreeningError::Storage(e.to_string())
    }
}

impl From<ort::OrtError> for ScreeningError {
    fn from(e: ort::OrtError) -> Self {
        ScreeningError::ModelUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScreeningError>;
