//! Feature vector assembly: demographics, interleaved per-round block, derived block.

use super::{
    DerivedFeatures, FeatureVector, Gender, MetricSequence, SubjectProfile, DEMOGRAPHIC_FEATURES,
    ROUND_METRICS,
};
use crate::config::DerivedVariant;
use crate::error::{Result, ScreeningError};

/// Column names for `round_count` rounds and the given derived block.
pub fn feature_names(round_count: usize, variant: DerivedVariant) -> Vec<String> {
    let mut names: Vec<String> = DEMOGRAPHIC_FEATURES.iter().map(|s| s.to_string()).collect();
    for i in 1..=round_count {
        names.extend(ROUND_METRICS.iter().map(|m| format!("{m}{i}")));
    }
    names.extend(DerivedFeatures::names(variant).iter().map(|s| s.to_string()));
    names
}

#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    variant: DerivedVariant,
}

impl FeatureAssembler {
    pub fn new(variant: DerivedVariant) -> Self {
        Self { variant }
    }

    /// Build the model input. Fails with `SchemaMismatch` when the result
    /// does not have exactly `expected` columns.
    pub fn assemble(
        &self,
        profile: &SubjectProfile,
        seq: &MetricSequence,
        derived: &DerivedFeatures,
        expected: usize,
    ) -> Result<FeatureVector> {
        let names = feature_names(seq.len(), self.variant);
        let mut values = Vec::with_capacity(names.len());

        values.push(if profile.gender == Gender::Male { 1.0 } else { 0.0 });
        values.push(flag(profile.native_lang));
        values.push(flag(profile.other_lang));
        values.push(profile.age as f64);

        let columns = seq.columns();
        for i in 0..seq.len() {
            values.extend(columns.iter().map(|col| col[i]));
        }

        for name in DerivedFeatures::names(self.variant) {
            let v = derived.get(name).ok_or_else(|| {
                ScreeningError::InvalidSession(format!("derived feature '{name}' not computed"))
            })?;
            values.push(v);
        }

        if values.len() != expected {
            tracing::warn!(expected, actual = values.len(), "feature vector does not match model schema");
            return Err(ScreeningError::SchemaMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(FeatureVector { names, values })
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
