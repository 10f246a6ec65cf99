//! Sensor reading and the feature vector derived from it.
//!
//! A [`Reading`] is produced once per sensing cycle and replaced (never
//! mutated) by the next one.

use serde::{Deserialize, Serialize};

/// Three-axis vibration sample (g).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vibration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A point-in-time snapshot of every sensor on the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Ambient temperature (°C).
    pub temperature_c: f32,
    /// Relative humidity (%).
    pub humidity_pct: f32,
    /// VOC index (0 – 500).
    pub voc_index: f32,
    /// CO2 concentration (ppm).
    pub co2_ppm: f32,
    /// Gas sensor resistance (Ω).
    pub gas_resistance: f32,
    /// Ambient noise level (dB).
    pub noise_db: f32,
    pub vibration: Vibration,
    /// Battery rail voltage (V).
    pub battery_v: f32,
    /// Solar panel voltage (V).
    pub solar_v: f32,
    /// Node power draw (mW).
    pub power_consumption_mw: f32,
    /// Monotonic capture time (ms since boot).
    pub timestamp_ms: u64,
    /// Set by the sample validator; `false` until validated.
    pub valid: bool,
}

impl Reading {
    /// Project the reading onto the classifier's input order.
    pub fn features(&self) -> FeatureVector {
        FeatureVector([
            self.temperature_c,
            self.humidity_pct,
            self.voc_index,
            self.co2_ppm,
            self.gas_resistance,
            self.noise_db,
        ])
    }
}

/// Number of classifier inputs.
pub const FEATURE_COUNT: usize = 6;

/// Fixed-order classifier input:
/// `[temperature, humidity, voc_index, co2, gas_resistance, noise]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn temperature(&self) -> f32 {
        self.0[0]
    }

    pub fn humidity(&self) -> f32 {
        self.0[1]
    }

    pub fn voc_index(&self) -> f32 {
        self.0[2]
    }

    pub fn co2(&self) -> f32 {
        self.0[3]
    }

    pub fn as_array(&self) -> &[f32; FEATURE_COUNT] {
        &self.0
    }
}
