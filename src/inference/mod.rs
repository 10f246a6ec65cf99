//! Environmental risk classification.
//!
//! ```text
//!   FeatureVector ──▶ RiskClassifier ──▶ RiskAssessment
//!                     ├─ RuleBased   (weighted thresholds, always available)
//!                     └─ Learned(M)  (model behind ModelPort)
//! ```
//!
//! The strategy is picked once at bring-up and stored as an enum variant;
//! every call to [`RiskClassifier::classify`] goes to the same arm.

pub mod model;
pub mod rules;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::ModelPort;
use crate::error::InferenceError;
use crate::reading::FeatureVector;

pub use model::{LEARNED_CONFIDENCE, NoModel};
pub use rules::RULE_CONFIDENCE;

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Discrete risk band derived from the continuous score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Normal,
    Attention,
    Warning,
    Critical,
}

impl RiskCategory {
    /// Step function from score to band.
    ///
    /// Critical is strictly above 0.8; Warning starts at 0.5 and Attention
    /// at 0.3 (both inclusive).
    pub fn from_risk(risk: f32) -> Self {
        if risk > 0.8 {
            Self::Critical
        } else if risk >= 0.5 {
            Self::Warning
        } else if risk >= 0.3 {
            Self::Attention
        } else {
            Self::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Attention => "attention",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one classification.
///
/// `confidence` is informational and never feeds a control decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk score in [0, 1].
    pub environmental_risk: f32,
    pub category: RiskCategory,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl RiskAssessment {
    /// Build an assessment, clamping the score and deriving its category.
    pub fn new(risk: f32, confidence: f32) -> Self {
        let risk = risk.clamp(0.0, 1.0);
        Self {
            environmental_risk: risk,
            category: RiskCategory::from_risk(risk),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Classification strategy, fixed at initialisation.
pub enum RiskClassifier<M = NoModel> {
    RuleBased,
    Learned(M),
}

impl<M: ModelPort> RiskClassifier<M> {
    /// Short label for logs and telemetry.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::RuleBased => "rule-based",
            Self::Learned(_) => "learned-model",
        }
    }

    /// Map a feature vector to a risk assessment.
    ///
    /// The rule-based arm cannot fail.  The learned arm surfaces model
    /// errors so the caller can skip the cycle.
    pub fn classify(&mut self, features: &FeatureVector) -> Result<RiskAssessment, InferenceError> {
        match self {
            Self::RuleBased => Ok(rules::classify(features)),
            Self::Learned(model) => model::classify(model, features),
        }
    }
}

impl<M> fmt::Debug for RiskClassifier<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuleBased => f.write_str("RiskClassifier::RuleBased"),
            Self::Learned(_) => f.write_str("RiskClassifier::Learned"),
        }
    }
}
