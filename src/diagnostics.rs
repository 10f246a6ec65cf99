//! Runtime diagnostics.
//!
//! Counters maintained by the node service and shipped inside every
//! telemetry payload.  All counters saturate instead of wrapping.

use serde::{Deserialize, Serialize};

use crate::scheduler::{TaskId, TaskSet};

/// Monotonic counters since boot (or since the last clear).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMetrics {
    pub ticks: u64,
    pub senses: u32,
    pub inferences: u32,
    pub syncs: u32,
    pub power_checks: u32,
    pub sensor_failures: u32,
    pub rejected_readings: u32,
    pub inference_failures: u32,
    pub sync_failures: u32,
    pub alerts_fired: u32,
    pub alerts_suppressed: u32,
    pub mode_changes: u32,
    /// Ticks whose wall time exceeded the shortest task interval.
    pub overruns: u32,
    pub restarts: u32,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one scheduler tick.
    pub fn record_tick(&mut self, ran: TaskSet) {
        self.ticks = self.ticks.saturating_add(1);
        for (task, counter) in [
            (TaskId::Sense, &mut self.senses),
            (TaskId::Infer, &mut self.inferences),
            (TaskId::Sync, &mut self.syncs),
            (TaskId::PowerCheck, &mut self.power_checks),
        ] {
            if ran.contains(task) {
                bump(counter);
            }
        }
    }

    pub fn record_sensor_failure(&mut self) {
        bump(&mut self.sensor_failures);
    }

    pub fn record_rejected_reading(&mut self) {
        bump(&mut self.rejected_readings);
    }

    pub fn record_inference_failure(&mut self) {
        bump(&mut self.inference_failures);
    }

    pub fn record_sync_failure(&mut self) {
        bump(&mut self.sync_failures);
    }

    pub fn record_alert(&mut self) {
        bump(&mut self.alerts_fired);
    }

    pub fn record_suppressed_alert(&mut self) {
        bump(&mut self.alerts_suppressed);
    }

    pub fn record_mode_change(&mut self) {
        bump(&mut self.mode_changes);
    }

    pub fn record_overrun(&mut self) {
        bump(&mut self.overruns);
    }

    pub fn record_restart(&mut self) {
        bump(&mut self.restarts);
    }
}

fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}
