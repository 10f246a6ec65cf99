//! System configuration parameters
//!
//! All tunable parameters for the node controller.
//! Values can be overridden via NVS (non-volatile storage) or a runtime
//! `UpdateConfig` command.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::power::{IntervalSet, PowerMode};

/// Which risk classification strategy to bring up at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifierStrategy {
    /// Weighted threshold rules (always available).
    RuleBased,
    /// Learned model; falls back to rules if the model fails to load.
    LearnedModel,
}

/// Inclusive physical bounds applied by the sample validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationBounds {
    pub temperature_c: (f32, f32),
    pub humidity_pct: (f32, f32),
    pub co2_ppm: (f32, f32),
    pub voc_index: (f32, f32),
}

impl Default for ValidationBounds {
    fn default() -> Self {
        Self {
            temperature_c: (-40.0, 85.0),
            humidity_pct: (0.0, 100.0),
            co2_ppm: (350.0, 10_000.0),
            voc_index: (0.0, 500.0),
        }
    }
}

/// Task cadence for each power mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalTable {
    pub emergency: IntervalSet,
    pub power_save: IntervalSet,
    pub normal: IntervalSet,
    pub high_performance: IntervalSet,
}

impl IntervalTable {
    pub fn for_mode(&self, mode: PowerMode) -> IntervalSet {
        match mode {
            PowerMode::Emergency => self.emergency,
            PowerMode::PowerSave => self.power_save,
            PowerMode::Normal => self.normal,
            PowerMode::HighPerformance => self.high_performance,
        }
    }
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self {
            emergency: IntervalSet::new(60_000, 300_000),
            power_save: IntervalSet::new(30_000, 120_000),
            normal: IntervalSet::new(5_000, 10_000),
            high_performance: IntervalSet::new(1_000, 5_000),
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Validation ---
    pub bounds: ValidationBounds,

    // --- Inference ---
    /// Strategy selected at initialisation
    pub classifier: ClassifierStrategy,

    // --- Alerting ---
    /// Risk score strictly above which an alert fires
    pub alert_threshold: f32,
    /// Minimum spacing between alerts (ms). `None` = one infer interval.
    pub alert_cooldown_ms: Option<u64>,

    // --- Power ---
    /// Per-mode task intervals
    pub intervals: IntervalTable,
    /// Battery percent below which the node enters Emergency
    pub emergency_battery_pct: f32,
    /// Battery percent below which the node enters PowerSave
    pub power_save_battery_pct: f32,
    /// Solar input (mW) strictly above which HighPerformance is forced
    pub solar_override_mw: f32,
    /// Extra battery percent required before stepping up a mode
    pub battery_hysteresis_pct: f32,
    /// Solar drop (mW) below the override threshold before releasing it
    pub solar_hysteresis_mw: f32,
    /// Battery voltage read as 0 %
    pub battery_empty_v: f32,
    /// Battery voltage read as 100 %
    pub battery_full_v: f32,
    /// Nominal solar panel current used to estimate harvested power
    pub solar_nominal_current_ma: f32,

    // --- Timing ---
    /// Telemetry broadcast interval (milliseconds)
    pub sync_interval_ms: u64,
    /// Power re-evaluation interval (milliseconds)
    pub power_check_interval_ms: u64,
    /// Idle slice between scheduler ticks (milliseconds)
    pub idle_slice_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            bounds: ValidationBounds::default(),

            classifier: ClassifierStrategy::RuleBased,

            alert_threshold: 0.8,
            alert_cooldown_ms: None,

            intervals: IntervalTable::default(),
            emergency_battery_pct: 20.0,
            power_save_battery_pct: 50.0,
            solar_override_mw: 100.0,
            battery_hysteresis_pct: 5.0,
            solar_hysteresis_mw: 10.0,
            battery_empty_v: 3.0,
            battery_full_v: 4.2,
            solar_nominal_current_ma: 20.0,

            sync_interval_ms: 30_000,
            power_check_interval_ms: 60_000,
            idle_slice_ms: 50,
        }
    }
}

impl SystemConfig {
    /// Shortest interval any task can run at (used for overrun detection).
    pub fn shortest_interval_ms(&self) -> u64 {
        let t = &self.intervals;
        [t.emergency, t.power_save, t.normal, t.high_performance]
            .iter()
            .map(|i| i.sense_ms.min(i.infer_ms))
            .chain([self.sync_interval_ms, self.power_check_interval_ms])
            .min()
            .unwrap_or(u64::MAX)
    }
}

/// Range-check every field that could wedge the node.
///
/// Runs before a config goes live and again before it is persisted.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    let b = &cfg.bounds;
    for (lo, hi) in [b.temperature_c, b.humidity_pct, b.co2_ppm, b.voc_index] {
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(ConfigError::ValidationFailed(
                "validation bounds must be finite with min < max",
            ));
        }
    }
    if !(cfg.alert_threshold > 0.0 && cfg.alert_threshold <= 1.0) {
        return Err(ConfigError::ValidationFailed(
            "alert_threshold must be in (0.0, 1.0]",
        ));
    }
    let t = &cfg.intervals;
    for iv in [t.emergency, t.power_save, t.normal, t.high_performance] {
        if !(100..=3_600_000).contains(&iv.sense_ms) || !(100..=3_600_000).contains(&iv.infer_ms) {
            return Err(ConfigError::ValidationFailed(
                "sense/infer intervals must be 100 ms – 1 h",
            ));
        }
    }
    if !(0.0..=100.0).contains(&cfg.emergency_battery_pct)
        || !(0.0..=100.0).contains(&cfg.power_save_battery_pct)
    {
        return Err(ConfigError::ValidationFailed(
            "battery thresholds must be 0–100 %",
        ));
    }
    if cfg.emergency_battery_pct > cfg.power_save_battery_pct {
        return Err(ConfigError::ValidationFailed(
            "emergency_battery_pct must be <= power_save_battery_pct",
        ));
    }
    if !(cfg.solar_override_mw >= 0.0) || !(cfg.solar_hysteresis_mw >= 0.0) {
        return Err(ConfigError::ValidationFailed(
            "solar thresholds must be non-negative",
        ));
    }
    if !(cfg.battery_hysteresis_pct >= 0.0 && cfg.battery_hysteresis_pct <= 50.0) {
        return Err(ConfigError::ValidationFailed(
            "battery_hysteresis_pct must be 0–50",
        ));
    }
    if !(cfg.solar_nominal_current_ma.is_finite() && cfg.solar_nominal_current_ma >= 0.0) {
        return Err(ConfigError::ValidationFailed(
            "solar_nominal_current_ma must be finite and non-negative",
        ));
    }
    if !(cfg.battery_empty_v < cfg.battery_full_v) {
        return Err(ConfigError::ValidationFailed(
            "battery_empty_v must be < battery_full_v",
        ));
    }
    if !(1_000..=3_600_000).contains(&cfg.sync_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "sync_interval_ms must be 1 s – 1 h",
        ));
    }
    if !(1_000..=3_600_000).contains(&cfg.power_check_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "power_check_interval_ms must be 1 s – 1 h",
        ));
    }
    if !(1..=1_000).contains(&cfg.idle_slice_ms) {
        return Err(ConfigError::ValidationFailed(
            "idle_slice_ms must be 1–1000",
        ));
    }
    Ok(())
}
