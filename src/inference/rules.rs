//! Rule-based risk scoring.
//!
//! Four independent, additive contributions.  The thresholds and weights
//! are product policy; changing them changes field behaviour.
//!
//! | Condition                         | Weight |
//! |-----------------------------------|--------|
//! | temperature < 0 °C or > 40 °C     | 0.3    |
//! | humidity < 20 % or > 80 %         | 0.2    |
//! | CO2 > 1000 ppm                    | 0.3    |
//! | VOC index > 200                   | 0.2    |

use super::RiskAssessment;
use crate::reading::FeatureVector;

/// Fixed confidence reported by the rule-based strategy.
pub const RULE_CONFIDENCE: f32 = 0.8;

const TEMP_WEIGHT: f32 = 0.3;
const HUMIDITY_WEIGHT: f32 = 0.2;
const CO2_WEIGHT: f32 = 0.3;
const VOC_WEIGHT: f32 = 0.2;

const TEMP_LOW_C: f32 = 0.0;
const TEMP_HIGH_C: f32 = 40.0;
const HUMIDITY_LOW_PCT: f32 = 20.0;
const HUMIDITY_HIGH_PCT: f32 = 80.0;
const CO2_HIGH_PPM: f32 = 1000.0;
const VOC_HIGH: f32 = 200.0;

/// Raw accumulated score before clamping.
pub fn score(f: &FeatureVector) -> f32 {
    let mut risk = 0.0f32;

    let t = f.temperature();
    if t < TEMP_LOW_C || t > TEMP_HIGH_C {
        risk += TEMP_WEIGHT;
    }

    let h = f.humidity();
    if h < HUMIDITY_LOW_PCT || h > HUMIDITY_HIGH_PCT {
        risk += HUMIDITY_WEIGHT;
    }

    if f.co2() > CO2_HIGH_PPM {
        risk += CO2_WEIGHT;
    }

    if f.voc_index() > VOC_HIGH {
        risk += VOC_WEIGHT;
    }

    risk
}

/// Score and band the feature vector.  Pure and deterministic.
pub fn classify(f: &FeatureVector) -> RiskAssessment {
    RiskAssessment::new(score(f), RULE_CONFIDENCE)
}
