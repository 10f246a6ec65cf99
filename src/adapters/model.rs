//! Learned-model adapter.
//!
//! A logistic model over the six-feature input, with its weights stored as
//! a postcard blob in the `model` NVS namespace.  Implements [`ModelPort`]
//! so the classifier can run it without knowing where the weights live.
//!
//! ```text
//!   risk = sigmoid( Σ wᵢ·(xᵢ - μᵢ)/σᵢ  +  bias )
//! ```

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ModelOutput, ModelPort, StorageError, StoragePort};
use crate::error::InferenceError;
use crate::reading::FEATURE_COUNT;

const MODEL_NAMESPACE: &str = "model";
const MODEL_KEY: &str = "risk_v1";
const MAX_MODEL_BLOB: usize = 128;

/// Model parameters as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub mean: [f32; FEATURE_COUNT],
    pub scale: [f32; FEATURE_COUNT],
    pub weights: [f32; FEATURE_COUNT],
    pub bias: f32,
}

impl LogisticModel {
    /// Load the model from storage.
    pub fn load(storage: &impl StoragePort) -> Result<Self, InferenceError> {
        let mut buf = [0u8; MAX_MODEL_BLOB];
        let len = storage
            .read(MODEL_NAMESPACE, MODEL_KEY, &mut buf)
            .map_err(|e| match e {
                StorageError::NotFound => InferenceError::ModelMissing,
                e => {
                    warn!("Model: {} read failed: {}", MODEL_KEY, e);
                    InferenceError::LoadFailed
                }
            })?;
        let model: Self = postcard::from_bytes(&buf[..len]).map_err(|_| InferenceError::LoadFailed)?;
        model.check()?;
        info!("Model: loaded {} ({} bytes)", MODEL_KEY, len);
        Ok(model)
    }

    /// Persist the model (provisioning path).
    pub fn store(&self, storage: &mut impl StoragePort) -> Result<(), InferenceError> {
        self.check()?;
        let bytes = postcard::to_allocvec(self).map_err(|_| InferenceError::LoadFailed)?;
        storage
            .write(MODEL_NAMESPACE, MODEL_KEY, &bytes)
            .map_err(|e| {
                warn!("Model: store failed: {}", e);
                InferenceError::LoadFailed
            })
    }

    fn check(&self) -> Result<(), InferenceError> {
        let finite = self
            .mean
            .iter()
            .chain(&self.weights)
            .chain(core::iter::once(&self.bias))
            .all(|v| v.is_finite());
        let scaled = self.scale.iter().all(|s| s.is_finite() && *s > 0.0);
        if finite && scaled {
            Ok(())
        } else {
            Err(InferenceError::LoadFailed)
        }
    }
}

impl ModelPort for LogisticModel {
    fn invoke(&mut self, input: &[f32; FEATURE_COUNT]) -> Result<ModelOutput, InferenceError> {
        let logit = input
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .zip(&self.weights)
            .map(|((x, (m, s)), w)| w * (x - m) / s)
            .sum::<f32>()
            + self.bias;
        if !logit.is_finite() {
            return Err(InferenceError::InvokeFailed);
        }
        let risk = 1.0 / (1.0 + (-logit).exp());

        let mut out = ModelOutput::new();
        out.push(risk).map_err(|_| InferenceError::BadOutput)?;
        Ok(out)
    }
}
