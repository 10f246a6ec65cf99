//! Hardware adapter: bridges the sensor front-end and indicators to the
//! domain port traits.
//!
//! On the host the sensor side is a deterministic simulation: slow diurnal
//! drift on the environmental channels plus a battery that discharges and
//! a solar panel that follows a day curve.  Tests and the bench binary can
//! pin the next readings or inject bus failures.
//!
//! The indicator side feeds an [`IndicatorEngine`]; [`SimulatedHardware::refresh`]
//! advances its pattern and latches the pin output.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::app::ports::{IndicatorPort, SensorPort};
use crate::app::service::NodeHealth;
use crate::drivers::indicator::{IndicatorEngine, IndicatorOutput};
use crate::error::SensorError;
use crate::power::PowerMode;
use crate::reading::{Reading, Vibration};

/// Length of one simulated day.
const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Sensor warm-up after power-on, during which reads fail.
pub const WARMUP_MS: u64 = 2_000;

pub struct SimulatedHardware {
    scripted: VecDeque<Result<Reading, SensorError>>,
    /// Simulated milliseconds per real millisecond (1 = real time).
    time_scale: u64,
    indicator: IndicatorEngine,
    output: IndicatorOutput,
    last_refresh_ms: u64,
    present: bool,
}

impl Default for SimulatedHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self {
            scripted: VecDeque::new(),
            time_scale: 1,
            indicator: IndicatorEngine::new(),
            output: IndicatorOutput {
                rgb: (0, 0, 0),
                buzzer: false,
            },
            last_refresh_ms: 0,
            present: true,
        }
    }

    /// Run the simulated day `scale` times faster than real time.
    pub fn with_time_scale(mut self, scale: u64) -> Self {
        self.time_scale = scale.max(1);
        self
    }

    /// Queue a reading (or failure) to be returned before the simulation resumes.
    pub fn script(&mut self, next: Result<Reading, SensorError>) {
        self.scripted.push_back(next);
    }

    /// Unplug / replug the sensor front-end.
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// Bring-up probe: the sensor bus answers.
    pub fn probe(&self) -> Result<(), SensorError> {
        if self.present {
            Ok(())
        } else {
            Err(SensorError::NotPresent)
        }
    }

    /// Advance the indicator pattern to `now_ms` and latch the output.
    pub fn refresh(&mut self, now_ms: u64) -> IndicatorOutput {
        let delta = now_ms.saturating_sub(self.last_refresh_ms).min(u64::from(u32::MAX)) as u32;
        self.last_refresh_ms = now_ms;
        let out = self.indicator.tick(delta);
        if out != self.output {
            trace!("Indicator: rgb={:?} buzzer={}", out.rgb, out.buzzer);
        }
        self.output = out;
        out
    }

    pub fn output(&self) -> IndicatorOutput {
        self.output
    }

    pub fn is_escalated(&self) -> bool {
        self.indicator.is_escalated()
    }

    fn simulate(&self, now_ms: u64) -> Reading {
        let sim_ms = now_ms.saturating_mul(self.time_scale);
        let day = (sim_ms % DAY_MS) as f32 / DAY_MS as f32;
        let wave = (day * core::f32::consts::TAU).sin();
        let sun = wave.max(0.0);
        // Battery drains a little each simulated day and recharges with the sun.
        let days = (sim_ms / DAY_MS) as f32;
        let battery_v = (4.1 - 0.05 * days + 0.1 * sun).clamp(3.0, 4.2);

        Reading {
            temperature_c: 18.0 + 8.0 * wave,
            humidity_pct: 55.0 - 15.0 * wave,
            voc_index: 90.0 + 40.0 * sun,
            co2_ppm: 600.0 + 250.0 * (1.0 - sun),
            gas_resistance: 45_000.0 - 5_000.0 * sun,
            noise_db: 38.0 + 10.0 * sun,
            vibration: Vibration {
                x: 0.01,
                y: -0.02,
                z: 1.0,
            },
            battery_v,
            solar_v: 6.5 * sun,
            power_consumption_mw: 45.0,
            timestamp_ms: now_ms,
            valid: false,
        }
    }
}

impl SensorPort for SimulatedHardware {
    fn read(&mut self, now_ms: u64) -> Result<Reading, SensorError> {
        if let Some(next) = self.scripted.pop_front() {
            return next.map(|r| Reading {
                timestamp_ms: now_ms,
                valid: false,
                ..r
            });
        }
        if !self.present {
            return Err(SensorError::BusFailed);
        }
        if now_ms < WARMUP_MS {
            return Err(SensorError::WarmingUp);
        }
        Ok(self.simulate(now_ms))
    }
}

impl IndicatorPort for SimulatedHardware {
    fn set_escalation(&mut self, engaged: bool) {
        debug!("Indicator: escalation {}", if engaged { "ON" } else { "off" });
        self.indicator.set_escalation(engaged);
    }

    fn show_health(&mut self, health: NodeHealth) {
        self.indicator.set_health(health);
    }

    fn show_power_mode(&mut self, mode: PowerMode) {
        self.indicator.set_power_mode(mode);
    }
}
