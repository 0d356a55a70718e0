//! Opaque classifier consumed through `predict_proba` / `feature_count`.
//!
//! - [`OnnxClassifier`] runs the exported model
//! - [`ModelBundle`] wraps it with imputer, scaler and metadata
//! - [`SharedModel`] loads the bundle exactly once and hands out a read-only handle

mod artifacts;
mod onnx;

pub use artifacts::{MeanImputer, ModelMetadata, StandardScaler};
pub use onnx::OnnxClassifier;

use crate::config::ModelConfig;
use crate::error::{Result, ScreeningError};
use crate::features::FeatureVector;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

pub trait Classifier: Send + Sync {
    /// `[P(class0), P(class1)]` for one assembled vector.
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2]>;

    /// Number of columns the model was trained with.
    fn feature_count(&self) -> usize;

    fn version(&self) -> &str {
        "unversioned"
    }
}

/// Classifier plus its preprocessing artifacts, immutable after load.
pub struct ModelBundle {
    classifier: OnnxClassifier,
    imputer: Option<MeanImputer>,
    scaler: Option<StandardScaler>,
    metadata: ModelMetadata,
    feature_count: usize,
}

impl ModelBundle {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let metadata = ModelMetadata::load(&config.metadata_path)?;
        let classifier = OnnxClassifier::load(&config.model_path)?;
        let feature_count = metadata
            .feature_count()
            .or(classifier.input_dim())
            .ok_or_else(|| {
                ScreeningError::ModelUnavailable(
                    "model declares no feature count (metadata or input shape)".into(),
                )
            })?;

        let imputer = config
            .imputer_path
            .as_deref()
            .map(MeanImputer::load)
            .transpose()?;
        let scaler = config
            .scaler_path
            .as_deref()
            .map(StandardScaler::load)
            .transpose()?;
        if let Some(imp) = &imputer {
            check_prefix_width("imputer", imp.len(), feature_count)?;
            if imp.len() < feature_count {
                tracing::info!(
                    imputer_width = imp.len(),
                    feature_count,
                    "imputer covers leading columns only"
                );
            }
        }
        if let Some(s) = &scaler {
            check_width("scaler", s.len(), feature_count)?;
        }

        tracing::info!(
            version = %metadata.version,
            feature_count,
            decision_threshold = ?metadata.decision_threshold,
            imputer = imputer.is_some(),
            scaler = scaler.is_some(),
            "model bundle loaded"
        );
        Ok(Self {
            classifier,
            imputer,
            scaler,
            metadata,
            feature_count,
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Imputers fitted before the derived block was added cover a column prefix.
fn check_prefix_width(what: &str, width: usize, expected: usize) -> Result<()> {
    if width == 0 || width > expected {
        return Err(ScreeningError::ModelUnavailable(format!(
            "{what} covers {width} features, model expects at most {expected}"
        )));
    }
    Ok(())
}

/// Values of `features` in the model's training column order. An empty
/// column list means the model takes the assembled order as is.
fn align_columns(columns: &[String], features: &FeatureVector) -> Result<Vec<f64>> {
    if columns.is_empty() || features.names == columns {
        return Ok(features.values.clone());
    }
    let by_name: HashMap<&str, f64> = features
        .names
        .iter()
        .map(String::as_str)
        .zip(features.values.iter().copied())
        .collect();
    columns
        .iter()
        .map(|c| {
            by_name
                .get(c.as_str())
                .copied()
                .ok_or_else(|| ScreeningError::MissingColumn(c.clone()))
        })
        .collect()
}

fn check_width(what: &str, width: usize, expected: usize) -> Result<()> {
    if width != expected {
        return Err(ScreeningError::ModelUnavailable(format!(
            "{what} covers {width} features, model expects {expected}"
        )));
    }
    Ok(())
}

impl Classifier for ModelBundle {
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2]> {
        let mut values = align_columns(&self.metadata.features, features)?;
        if let Some(imp) = &self.imputer {
            imp.transform(&mut values);
        }
        if let Some(s) = &self.scaler {
            s.transform(&mut values);
        }
        self.classifier.predict(&values)
    }

    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn version(&self) -> &str {
        &self.metadata.version
    }
}

/// Process-wide classifier handle. The first `get` performs the load; racing
/// callers wait on the same initialization and all see its outcome.
pub struct SharedModel {
    config: Option<ModelConfig>,
    cell: OnceLock<std::result::Result<Arc<dyn Classifier>, String>>,
}

impl SharedModel {
    /// Load lazily from artifacts on first use.
    pub fn lazy(config: ModelConfig) -> Self {
        Self {
            config: Some(config),
            cell: OnceLock::new(),
        }
    }

    /// Wrap an already constructed classifier.
    pub fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(classifier));
        Self { config: None, cell }
    }

    pub fn get(&self) -> Result<Arc<dyn Classifier>> {
        let loaded = self.cell.get_or_init(|| {
            let Some(config) = &self.config else {
                return Err("no model configured".to_string());
            };
            match ModelBundle::load(config) {
                Ok(bundle) => Ok(Arc::new(bundle) as Arc<dyn Classifier>),
                Err(e) => {
                    tracing::warn!(error = %e, "model load failed; scoring disabled");
                    Err(match e {
                        ScreeningError::ModelUnavailable(msg) => msg,
                        other => other.to_string(),
                    })
                }
            }
        });
        match loaded {
            Ok(c) => Ok(Arc::clone(c)),
            Err(msg) => Err(ScreeningError::ModelUnavailable(msg.clone())),
        }
    }

    /// True once a load has succeeded. Does not trigger loading.
    pub fn is_ready(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> FeatureVector {
        FeatureVector {
            names: pairs.iter().map(|(n, _)| n.to_string()).collect(),
            values: pairs.iter().map(|(_, v)| *v).collect(),
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn columns_follow_training_order() {
        let v = vector(&[("Age", 8.0), ("clicks_total", 320.0), ("global_accuracy", 0.9)]);
        let aligned =
            align_columns(&columns(&["Age", "global_accuracy", "clicks_total"]), &v).unwrap();
        assert_eq!(aligned, vec![8.0, 0.9, 320.0]);
        assert_eq!(align_columns(&[], &v).unwrap(), v.values);
    }

    #[test]
    fn unknown_training_column_is_rejected() {
        let v = vector(&[("Age", 8.0), ("clicks_total", 320.0)]);
        match align_columns(&columns(&["Age", "consistency_score"]), &v) {
            Err(ScreeningError::MissingColumn(name)) => assert_eq!(name, "consistency_score"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn imputer_may_cover_a_prefix() {
        assert!(check_prefix_width("imputer", 196, 206).is_ok());
        assert!(check_prefix_width("imputer", 206, 206).is_ok());
        assert!(matches!(
            check_prefix_width("imputer", 207, 206),
            Err(ScreeningError::ModelUnavailable(_))
        ));
        assert!(check_prefix_width("imputer", 0, 206).is_err());
    }
}
