//! Outbound application events.
//!
//! The [`NodeService`](super::service::NodeService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, append to a flash
//! log, push over the radio, etc.

use log::Level;
use serde::Serialize;

use crate::alert::Alert;
use crate::diagnostics::RuntimeMetrics;
use crate::error::{CommsError, InferenceError, SensorError};
use crate::inference::RiskAssessment;
use crate::power::PowerMode;
use crate::reading::Reading;

use super::service::NodeHealth;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started (carries initial mode and strategy).
    Started {
        mode: PowerMode,
        strategy: &'static str,
        at_ms: u64,
    },

    /// A reading failed one or more bounds and was dropped.
    ReadingRejected { faults: u8, at_ms: u64 },

    /// The sensor read itself failed.
    SensorFailed { error: SensorError, at_ms: u64 },

    /// A classification completed.
    Assessed { assessment: RiskAssessment, at_ms: u64 },

    /// The model could not produce an assessment this cycle.
    InferenceFailed { error: InferenceError, at_ms: u64 },

    /// An emergency alert fired.
    Alert(Alert),

    /// The power governor switched modes.
    PowerModeChanged {
        from: PowerMode,
        to: PowerMode,
        at_ms: u64,
    },

    /// Telemetry could not be delivered.
    SyncFailed { error: CommsError, at_ms: u64 },

    /// Node health changed (degraded or halted).
    HealthChanged { health: NodeHealth, at_ms: u64 },

    /// All runtime state was re-initialised.
    Restarted { at_ms: u64 },

    /// A runtime config update failed validation; the live config is unchanged.
    ConfigRejected { reason: &'static str, at_ms: u64 },
}

impl AppEvent {
    /// Log level for this event.
    pub fn level(&self) -> Level {
        match self {
            Self::Started { .. }
            | Self::PowerModeChanged { .. }
            | Self::Restarted { .. }
            | Self::ReadingRejected { .. } => Level::Info,
            Self::Assessed { .. } => Level::Debug,
            Self::SensorFailed { .. }
            | Self::SyncFailed { .. }
            | Self::ConfigRejected { .. }
            | Self::Alert(_) => Level::Warn,
            Self::InferenceFailed { .. } => Level::Error,
            Self::HealthChanged { health, .. } => match health {
                NodeHealth::Nominal => Level::Info,
                NodeHealth::Degraded(_) => Level::Warn,
                NodeHealth::Halted(_) => Level::Error,
            },
        }
    }

    /// Monotonic timestamp of the event (ms since boot).
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::Alert(alert) => alert.timestamp_ms,
            Self::Started { at_ms, .. }
            | Self::ReadingRejected { at_ms, .. }
            | Self::SensorFailed { at_ms, .. }
            | Self::Assessed { at_ms, .. }
            | Self::InferenceFailed { at_ms, .. }
            | Self::PowerModeChanged { at_ms, .. }
            | Self::SyncFailed { at_ms, .. }
            | Self::HealthChanged { at_ms, .. }
            | Self::ConfigRejected { at_ms, .. }
            | Self::Restarted { at_ms } => *at_ms,
        }
    }
}

/// A point-in-time status snapshot, serialised for broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryData {
    pub at_ms: u64,
    pub mode: PowerMode,
    pub health: NodeHealth,
    pub strategy: &'static str,
    pub reading: Option<Reading>,
    pub assessment: Option<RiskAssessment>,
    pub escalated: bool,
    pub metrics: RuntimeMetrics,
}
