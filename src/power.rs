//! Power profile and mode governor.
//!
//! The node picks one of four operating modes from its battery level and
//! harvested solar power; each mode carries the sense/infer cadence the
//! scheduler runs at.
//!
//! ```text
//!   battery %  ──▶ baseline:  < 20 → Emergency
//!                             < 50 → PowerSave
//!                             else → Normal
//!   solar mW   ──▶ override:  > 100 → HighPerformance (last write wins)
//! ```
//!
//! The override is not a blend: strong sun masks an Emergency battery.
//!
//! [`PowerProfile::derive_mode`] is a pure function of its two inputs.
//! [`PowerGovernor`] wraps it with hysteresis so the mode does not flap
//! when a reading hovers on a threshold.

use core::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{IntervalTable, SystemConfig};
use crate::reading::Reading;

// ═══════════════════════════════════════════════════════════════
//  Mode and intervals
// ═══════════════════════════════════════════════════════════════

/// Operating mode, ordered from most to least frugal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerMode {
    Emergency,
    PowerSave,
    Normal,
    HighPerformance,
}

impl PowerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::PowerSave => "power_save",
            Self::Normal => "normal",
            Self::HighPerformance => "high_performance",
        }
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cadence of the mode-dependent tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSet {
    pub sense_ms: u64,
    pub infer_ms: u64,
}

impl IntervalSet {
    pub const fn new(sense_ms: u64, infer_ms: u64) -> Self {
        Self { sense_ms, infer_ms }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Telemetry
// ═══════════════════════════════════════════════════════════════

/// Power inputs to mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerTelemetry {
    /// State of charge, 0 – 100 %.
    pub battery_pct: f32,
    /// Harvested solar power (mW).
    pub solar_mw: f32,
}

impl PowerTelemetry {
    /// Derive power telemetry from the raw rail voltages of a reading.
    ///
    /// Battery percent is linear between the calibrated empty and full
    /// voltages.  Solar power is panel voltage times nominal panel current.
    /// A non-finite rail reads as empty.
    pub fn from_reading(reading: &Reading, config: &SystemConfig) -> Self {
        let span = config.battery_full_v - config.battery_empty_v;
        let battery_pct = if span > 0.0 && reading.battery_v.is_finite() {
            ((reading.battery_v - config.battery_empty_v) / span * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let solar_mw = reading.solar_v * config.solar_nominal_current_ma;
        let solar_mw = if solar_mw.is_finite() { solar_mw.max(0.0) } else { 0.0 };
        Self {
            battery_pct,
            solar_mw,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Profile (pure)
// ═══════════════════════════════════════════════════════════════

/// Thresholds and interval table for mode derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerProfile {
    pub emergency_battery_pct: f32,
    pub power_save_battery_pct: f32,
    pub solar_override_mw: f32,
    pub intervals: IntervalTable,
}

impl Default for PowerProfile {
    fn default() -> Self {
        Self::from_config(&SystemConfig::default())
    }
}

impl PowerProfile {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            emergency_battery_pct: config.emergency_battery_pct,
            power_save_battery_pct: config.power_save_battery_pct,
            solar_override_mw: config.solar_override_mw,
            intervals: config.intervals,
        }
    }

    /// Baseline mode from battery level alone.
    pub fn battery_mode(&self, battery_pct: f32) -> PowerMode {
        // NaN lands in Emergency.
        if !(battery_pct >= self.emergency_battery_pct) {
            PowerMode::Emergency
        } else if battery_pct < self.power_save_battery_pct {
            PowerMode::PowerSave
        } else {
            PowerMode::Normal
        }
    }

    /// Pure mode derivation: battery baseline, then the solar override.
    pub fn derive_mode(&self, battery_pct: f32, solar_mw: f32) -> (PowerMode, IntervalSet) {
        let mut mode = self.battery_mode(battery_pct);
        if solar_mw > self.solar_override_mw {
            mode = PowerMode::HighPerformance;
        }
        (mode, self.intervals.for_mode(mode))
    }

    pub fn intervals_for(&self, mode: PowerMode) -> IntervalSet {
        self.intervals.for_mode(mode)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Governor (hysteresis)
// ═══════════════════════════════════════════════════════════════

/// Stateful wrapper that adds hysteresis around [`PowerProfile::derive_mode`].
///
/// - Downgrades apply immediately.
/// - A battery upgrade needs the battery to clear the threshold by
///   `battery_margin_pct`.
/// - Once engaged, the solar override holds until solar power falls to
///   `solar_override_mw - solar_margin_mw` or below.
#[derive(Debug, Clone)]
pub struct PowerGovernor {
    profile: PowerProfile,
    battery_margin_pct: f32,
    solar_margin_mw: f32,
    current: Option<PowerMode>,
}

impl PowerGovernor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            profile: PowerProfile::from_config(config),
            battery_margin_pct: config.battery_hysteresis_pct.max(0.0),
            solar_margin_mw: config.solar_hysteresis_mw.max(0.0),
            current: None,
        }
    }

    pub fn profile(&self) -> &PowerProfile {
        &self.profile
    }

    /// Mode decided on the last update, if any.
    pub fn current(&self) -> Option<PowerMode> {
        self.current
    }

    /// Adopt new thresholds and intervals; the current mode is kept until
    /// the next update.
    pub fn reconfigure(&mut self, config: &SystemConfig) {
        self.profile = PowerProfile::from_config(config);
        self.battery_margin_pct = config.battery_hysteresis_pct.max(0.0);
        self.solar_margin_mw = config.solar_hysteresis_mw.max(0.0);
    }

    /// Forget history (used on restart).
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Decide the mode for `telemetry`.
    pub fn update(&mut self, telemetry: PowerTelemetry) -> (PowerMode, IntervalSet) {
        let PowerTelemetry {
            battery_pct,
            solar_mw,
        } = telemetry;
        let prev = self.current;

        let override_held = prev == Some(PowerMode::HighPerformance)
            && solar_mw > self.profile.solar_override_mw - self.solar_margin_mw;

        let mode = if solar_mw > self.profile.solar_override_mw || override_held {
            PowerMode::HighPerformance
        } else {
            let target = self.profile.battery_mode(battery_pct);
            match prev {
                Some(p) if p != PowerMode::HighPerformance && target > p => {
                    let confirmed = self
                        .profile
                        .battery_mode(battery_pct - self.battery_margin_pct);
                    if confirmed > p { confirmed } else { p }
                }
                _ => target,
            }
        };

        if prev != Some(mode) {
            info!(
                "Power: {} -> {} (battery={:.0}% solar={:.0}mW)",
                prev.map_or("boot", PowerMode::as_str),
                mode,
                battery_pct,
                solar_mw
            );
        }
        self.current = Some(mode);
        (mode, self.profile.intervals_for(mode))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
