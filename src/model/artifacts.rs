//! JSON companions of the classifier: info record, imputer and scaler.

use crate::error::{Result, ScreeningError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        ScreeningError::ModelUnavailable(format!("{what} {}: {e}", path.display()))
    })?;
    serde_json::from_str(&data)
        .map_err(|e| ScreeningError::ModelUnavailable(format!("{what} {}: {e}", path.display())))
}

fn unversioned() -> String {
    "unversioned".to_string()
}

/// Info record written next to the trained model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default = "unversioned")]
    pub version: String,
    #[serde(default)]
    pub model_type: Option<String>,
    /// Column names in training order
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub n_features: Option<usize>,
    /// Threshold the model itself was tuned at (informational)
    #[serde(default)]
    pub decision_threshold: Option<f64>,
    #[serde(default)]
    pub roc_auc: Option<f64>,
}

impl ModelMetadata {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path, "model metadata")
    }

    pub fn feature_count(&self) -> Option<usize> {
        if self.features.is_empty() {
            self.n_features
        } else {
            Some(self.features.len())
        }
    }
}

/// Replaces non-finite entries with per-column training statistics. Columns
/// past the end of `statistics` are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanImputer {
    pub statistics: Vec<f64>,
}

impl MeanImputer {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path, "imputer")
    }

    pub fn len(&self) -> usize {
        self.statistics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty()
    }

    pub fn transform(&self, values: &mut [f64]) {
        for (v, fill) in values.iter_mut().zip(&self.statistics) {
            if !v.is_finite() {
                *v = *fill;
            }
        }
    }
}

/// `(x - mean) / scale`; a zero scale leaves the centered value as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn load(path: &Path) -> Result<Self> {
        let s: Self = read_json(path, "scaler")?;
        if s.mean.len() != s.scale.len() {
            return Err(ScreeningError::ModelUnavailable(format!(
                "scaler has {} means but {} scales",
                s.mean.len(),
                s.scale.len()
            )));
        }
        Ok(s)
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn transform(&self, values: &mut [f64]) {
        for ((v, m), s) in values.iter_mut().zip(&self.mean).zip(&self.scale) {
            let s = if *s == 0.0 { 1.0 } else { *s };
            *v = (*v - m) / s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_prefers_feature_list() {
        let m: ModelMetadata = serde_json::from_str(
            r#"{"version":"2.2_xgboost_optimized","features":["a","b","c"],"n_features":9}"#,
        )
        .unwrap();
        assert_eq!(m.feature_count(), Some(3));
        let m: ModelMetadata = serde_json::from_str(r#"{"n_features":205}"#).unwrap();
        assert_eq!(m.feature_count(), Some(205));
        assert_eq!(m.version, "unversioned");
    }

    #[test]
    fn imputer_fills_only_missing() {
        let imp = MeanImputer {
            statistics: vec![1.0, 2.0, 3.0],
        };
        let mut v = vec![5.0, f64::NAN, f64::INFINITY];
        imp.transform(&mut v);
        assert_eq!(v, vec![5.0, 2.0, 3.0]);
    }

    #[test]
    fn short_imputer_leaves_trailing_columns() {
        let imp = MeanImputer {
            statistics: vec![1.0, 2.0],
        };
        let mut v = vec![f64::NAN, 7.0, f64::NAN];
        imp.transform(&mut v);
        assert_eq!(v[..2], [1.0, 7.0]);
        assert!(v[2].is_nan());
    }

    #[test]
    fn scaler_standardizes_and_tolerates_zero_scale() {
        let s = StandardScaler {
            mean: vec![10.0, 1.0],
            scale: vec![2.0, 0.0],
        };
        let mut v = vec![14.0, 3.0];
        s.transform(&mut v);
        assert_eq!(v, vec![2.0, 2.0]);
    }
}
