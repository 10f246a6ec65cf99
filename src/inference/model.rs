//! Learned-model strategy.
//!
//! The model itself lives behind [`ModelPort`]: the runtime, tensor arena
//! and weights are the adapter's concern.  This module only feeds the
//! 6-element input tensor, reads the risk score from output element 0 and
//! checks that it is usable.

use log::error;

use super::RiskAssessment;
use crate::app::ports::{ModelOutput, ModelPort};
use crate::error::InferenceError;
use crate::reading::{FEATURE_COUNT, FeatureVector};

/// Fixed confidence reported by the learned strategy.
///
/// The model exposes no confidence output, so this is a constant.
pub const LEARNED_CONFIDENCE: f32 = 0.95;

/// Run one inference through `model`.
pub fn classify<M: ModelPort>(
    model: &mut M,
    features: &FeatureVector,
) -> Result<RiskAssessment, InferenceError> {
    let output = model.invoke(features.as_array()).inspect_err(|e| {
        error!("Model invocation failed: {e}");
    })?;

    let risk = *output.first().ok_or(InferenceError::BadOutput)?;
    if !risk.is_finite() {
        error!("Model produced non-finite risk: {risk}");
        return Err(InferenceError::BadOutput);
    }

    Ok(RiskAssessment::new(risk, LEARNED_CONFIDENCE))
}

/// Placeholder model for rule-based deployments.
///
/// Every invocation fails with [`InferenceError::ModelMissing`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModel;

impl ModelPort for NoModel {
    fn invoke(&mut self, _input: &[f32; FEATURE_COUNT]) -> Result<ModelOutput, InferenceError> {
        Err(InferenceError::ModelMissing)
    }
}
