//! Feature extraction pipeline: activities → metric sequences → derived stats → vector.

use super::{
    ActivityRecord, DerivedFeatures, FeatureAssembler, FeatureVector, MetricSequence,
    RoundAggregator, SubjectProfile,
};
use crate::config::FeaturesConfig;
use crate::error::Result;

/// Intermediate products of one extraction, kept for auditing and storage.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub sequence: MetricSequence,
    pub derived: DerivedFeatures,
    pub vector: FeatureVector,
}

/// Stateless; one instance can serve concurrent requests.
pub struct FeatureExtractor {
    config: FeaturesConfig,
    aggregator: RoundAggregator,
    assembler: FeatureAssembler,
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Self {
        Self {
            aggregator: RoundAggregator::new(&config),
            assembler: FeatureAssembler::new(config.derived),
            config,
        }
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    /// Vector length this extractor produces.
    pub fn feature_count(&self) -> usize {
        super::feature_names(self.aggregator.round_count(), self.config.derived).len()
    }

    /// Run the full extraction, checking the result against the model's
    /// declared feature count before anything reaches inference.
    pub fn extract(
        &self,
        profile: &SubjectProfile,
        activities: &[ActivityRecord],
        expected: usize,
    ) -> Result<Extraction> {
        let sequence = self.aggregator.aggregate(activities);
        let derived = DerivedFeatures::compute(&sequence, &self.config);
        let vector = self.assembler.assemble(profile, &sequence, &derived, expected)?;
        Ok(Extraction {
            sequence,
            derived,
            vector,
        })
    }
}
