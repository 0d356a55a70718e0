//! Blends an accuracy heuristic with the classifier's risk probability and
//! maps the result onto ordinal risk levels.

use crate::config::RiskConfig;
use crate::error::{Result, ScreeningError};
use crate::features::{mean, FeatureVector};
use crate::model::Classifier;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tolerance for probabilities reported slightly outside [0, 1].
const PROBA_SLACK: f64 = 1e-6;
const HEURISTIC_CAP: f64 = 0.99;
const CONSISTENCY_PENALTY: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Bajo,
    Medio,
    Alto,
}

impl RiskLevel {
    pub fn from_probability(p: f64, config: &RiskConfig) -> Self {
        if p >= config.high_threshold {
            RiskLevel::Alto
        } else if p >= config.medium_threshold {
            RiskLevel::Medio
        } else {
            RiskLevel::Bajo
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Bajo => "Bajo",
            RiskLevel::Medio => "Medio",
            RiskLevel::Alto => "Alto",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Bajo => "El niño no presenta indicadores significativos de dislexia.",
            RiskLevel::Medio => "Se recomienda evaluación más profunda por especialista.",
            RiskLevel::Alto => "Se recomienda evaluación neuropsicológica urgente.",
        }
    }
}

/// Transparent accuracy-based estimate, independent of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicScore {
    pub probability: f64,
    /// Mean of the per-round accuracy columns
    pub global_accuracy: f64,
    /// 1 - min(std(accuracy), 1)
    pub consistency: f64,
}

impl HeuristicScore {
    pub fn from_accuracies(accuracies: &[f64]) -> Self {
        let n = accuracies.len();
        let global_accuracy = mean(accuracies);
        let consistency = if n > 1 {
            let var = accuracies
                .iter()
                .map(|a| (a - global_accuracy).powi(2))
                .sum::<f64>()
                / n as f64;
            1.0 - var.sqrt().min(1.0)
        } else {
            0.5
        };

        let a = global_accuracy;
        let base = if a > 0.90 {
            (0.10 * (1.0 - a)).max(0.01)
        } else if a > 0.80 {
            0.10 + 0.15 * (0.90 - a)
        } else if a > 0.70 {
            0.25 + 0.20 * (0.80 - a)
        } else if a > 0.60 {
            0.45 + 0.20 * (0.70 - a)
        } else {
            (0.65 + 0.30 * (0.60 - a)).min(0.95)
        };
        let probability =
            (base + (1.0 - consistency) * CONSISTENCY_PENALTY).clamp(0.0, HEURISTIC_CAP);

        Self {
            probability,
            global_accuracy,
            consistency,
        }
    }
}

/// Scoring outcome for one screening session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: String,
    /// Unix millis
    pub ts: i64,
    pub probability_dyslexia: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub prediction: bool,
    /// Medio or Alto
    pub has_indicators: bool,
    pub heuristic_score: f64,
    pub model_score: f64,
    pub global_accuracy: f64,
    pub consistency: f64,
    pub model_version: String,
    pub recommendation: String,
}

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn classify(&self, probability: f64) -> RiskLevel {
        RiskLevel::from_probability(probability, &self.config)
    }

    /// Accuracy heuristic recomputed from the vector's `Accuracy{i}` columns.
    pub fn heuristic(&self, vector: &FeatureVector) -> HeuristicScore {
        HeuristicScore::from_accuracies(&vector.round_series("Accuracy"))
    }

    /// Classifier's probability of the risk class.
    pub fn model_score(&self, vector: &FeatureVector, model: &dyn Classifier) -> Result<f64> {
        let proba = model.predict_proba(vector)?;
        if proba
            .iter()
            .any(|p| !p.is_finite() || *p < -PROBA_SLACK || *p > 1.0 + PROBA_SLACK)
        {
            return Err(ScreeningError::ModelUnavailable(format!(
                "classifier returned malformed probabilities {proba:?}"
            )));
        }
        let negative = if self.config.positive_class == 0 { 1 } else { 0 };
        Ok((1.0 - proba[negative]).clamp(0.0, 1.0))
    }

    pub fn score(&self, vector: &FeatureVector, model: &dyn Classifier) -> Result<RiskAssessment> {
        let expected = model.feature_count();
        if vector.len() != expected {
            return Err(ScreeningError::SchemaMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let heuristic = self.heuristic(vector);
        let model_score = self.model_score(vector, model)?;
        let probability = (self.config.heuristic_weight * heuristic.probability
            + self.config.model_weight * model_score)
            .clamp(0.0, 1.0);
        let risk_level = self.classify(probability);

        tracing::debug!(
            heuristic = heuristic.probability,
            model_score,
            probability,
            level = risk_level.as_str(),
            "risk scored"
        );

        Ok(RiskAssessment {
            id: Uuid::new_v4().to_string(),
            ts: Utc::now().timestamp_millis(),
            probability_dyslexia: probability,
            confidence: 0.5 + 0.5 * heuristic.global_accuracy,
            risk_level,
            prediction: probability > self.config.decision_threshold,
            has_indicators: risk_level != RiskLevel::Bajo,
            heuristic_score: heuristic.probability,
            model_score,
            global_accuracy: heuristic.global_accuracy,
            consistency: heuristic.consistency,
            model_version: model.version().to_string(),
            recommendation: risk_level.recommendation().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_buckets() {
        let h = |a: f64| HeuristicScore::from_accuracies(&[a; 32]).probability;
        assert!((h(1.0) - 0.01).abs() < 1e-12);
        assert!((h(0.95) - 0.01).abs() < 1e-9);
        assert!((h(0.85) - 0.1075).abs() < 1e-9);
        assert!((h(0.75) - 0.26).abs() < 1e-9);
        assert!((h(0.65) - 0.46).abs() < 1e-9);
        assert!((h(0.3) - 0.74).abs() < 1e-9);
        assert!((h(0.0) - 0.83).abs() < 1e-9);
    }

    #[test]
    fn uniform_accuracy_on_bucket_edges() {
        let h = |a: f64| HeuristicScore::from_accuracies(&[a; 32]);
        for (acc, expected) in [(0.9, 0.10), (0.8, 0.25), (0.7, 0.45), (0.6, 0.65)] {
            let score = h(acc);
            assert_eq!(score.global_accuracy, acc);
            assert_eq!(score.consistency, 1.0);
            assert!(
                (score.probability - expected).abs() < 1e-12,
                "accuracy {acc}: got {}, expected {expected}",
                score.probability
            );
        }
    }

    #[test]
    fn inconsistent_accuracy_is_penalized() {
        let mut acc = vec![1.0; 16];
        acc.extend(vec![0.7; 16]);
        let h = HeuristicScore::from_accuracies(&acc);
        // mean 0.85, std 0.15 -> base 0.1075, penalty 0.15 * 0.15
        assert!((h.global_accuracy - 0.85).abs() < 1e-12);
        assert!((h.consistency - 0.85).abs() < 1e-9);
        assert!((h.probability - (0.1075 + 0.0225)).abs() < 1e-9);
    }

    #[test]
    fn classification_is_monotonic() {
        let config = RiskConfig::default();
        let mut prev = RiskLevel::Bajo;
        for i in 0..=1000 {
            let level = RiskLevel::from_probability(i as f64 / 1000.0, &config);
            assert!(level >= prev);
            prev = level;
        }
        assert_eq!(RiskLevel::from_probability(0.2499, &config), RiskLevel::Bajo);
        assert_eq!(RiskLevel::from_probability(0.25, &config), RiskLevel::Medio);
        assert_eq!(RiskLevel::from_probability(0.60, &config), RiskLevel::Alto);
    }

    #[test]
    fn legacy_thresholds() {
        let config = RiskConfig::legacy();
        assert_eq!(RiskLevel::from_probability(0.29, &config), RiskLevel::Bajo);
        assert_eq!(RiskLevel::from_probability(0.65, &config), RiskLevel::Medio);
        assert_eq!(RiskLevel::from_probability(0.70, &config), RiskLevel::Alto);
    }
}
