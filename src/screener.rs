//! Screening orchestration: session → features → schema check → risk → writer.

use crate::config::{FeaturesConfig, RiskConfig, ScreenerConfig};
use crate::error::Result;
use crate::features::{ActivityRecord, Extraction, FeatureExtractor, SubjectProfile};
use crate::model::SharedModel;
use crate::risk::{RiskAssessment, RiskEngine};
use crate::session::ScreeningSession;
use crate::storage::{ResultWriter, StoredResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub ready: bool,
    pub version: Option<String>,
    /// Columns the loaded model declares
    pub model_feature_count: Option<usize>,
    /// Columns the extractor produces with the current config
    pub extractor_feature_count: usize,
}

pub struct Screener {
    extractor: FeatureExtractor,
    engine: RiskEngine,
    model: Arc<SharedModel>,
    writer: Option<ResultWriter>,
}

impl Screener {
    pub fn new(features: FeaturesConfig, risk: RiskConfig, model: Arc<SharedModel>) -> Self {
        Self {
            extractor: FeatureExtractor::new(features),
            engine: RiskEngine::new(risk),
            model,
            writer: None,
        }
    }

    pub fn from_config(config: &ScreenerConfig, model: Arc<SharedModel>) -> Self {
        Self::new(config.features.clone(), config.risk.clone(), model)
    }

    /// Persist each assessment through `writer` (fire-and-forget).
    pub fn with_writer(mut self, writer: ResultWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Score raw activities. The vector is checked against the model's
    /// feature count before any inference call.
    pub fn assess_activities(
        &self,
        profile: &SubjectProfile,
        activities: &[ActivityRecord],
    ) -> Result<(RiskAssessment, Extraction)> {
        let classifier = self.model.get()?;
        let extraction = self
            .extractor
            .extract(profile, activities, classifier.feature_count())?;
        let assessment = self.engine.score(&extraction.vector, classifier.as_ref())?;
        Ok((assessment, extraction))
    }

    pub fn assess(&self, session: &ScreeningSession) -> Result<RiskAssessment> {
        let (assessment, extraction) = self.assess_activities(&session.profile, &session.activities)?;
        info!(
            session = session.label(),
            rounds = session.round_total(),
            malformed_fields = session.malformed_fields,
            probability = assessment.probability_dyslexia,
            level = assessment.risk_level.as_str(),
            "session assessed"
        );
        if let Some(writer) = &self.writer {
            writer.submit(StoredResult::new(session, &assessment, extraction.vector.len()));
        }
        Ok(assessment)
    }

    /// Score many sessions; one failure does not affect the others.
    pub fn assess_batch(&self, sessions: &[ScreeningSession]) -> Vec<Result<RiskAssessment>> {
        sessions.iter().map(|s| self.assess(s)).collect()
    }

    /// Health/info snapshot. Does not trigger a model load.
    pub fn model_info(&self) -> ModelInfo {
        let ready = self.model.is_ready();
        let loaded = if ready { self.model.get().ok() } else { None };
        ModelInfo {
            ready,
            version: loaded.as_ref().map(|c| c.version().to_string()),
            model_feature_count: loaded.as_ref().map(|c| c.feature_count()),
            extractor_feature_count: self.extractor.feature_count(),
        }
    }

    /// Flush pending writes.
    pub fn shutdown(mut self) {
        if let Some(writer) = self.writer.take() {
            writer.shutdown();
        }
    }
}
