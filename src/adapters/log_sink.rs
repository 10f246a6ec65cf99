//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the active `log` backend (UART / USB-CDC on the device, `env_logger`
//! on the host).  Each event is logged at the level it declares.

use log::log;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        let level = event.level();
        let at = event.timestamp_ms();
        match event {
            AppEvent::Started { mode, strategy, .. } => {
                log!(level, "START | t={}ms mode={} strategy={}", at, mode, strategy);
            }
            AppEvent::ReadingRejected { faults, .. } => {
                log!(level, "READ  | t={}ms rejected faults=0b{:04b}", at, faults);
            }
            AppEvent::SensorFailed { error, .. } => {
                log!(level, "READ  | t={}ms sensor failed: {}", at, error);
            }
            AppEvent::Assessed { assessment, .. } => {
                log!(
                    level,
                    "RISK  | t={}ms risk={:.2} category={} conf={:.2}",
                    at,
                    assessment.environmental_risk,
                    assessment.category,
                    assessment.confidence
                );
            }
            AppEvent::InferenceFailed { error, .. } => {
                log!(level, "RISK  | t={}ms inference failed: {}", at, error);
            }
            AppEvent::Alert(alert) => {
                log!(
                    level,
                    "ALERT | t={}ms {:?} severity={} risk={:.2} | {}",
                    at,
                    alert.kind,
                    alert.severity,
                    alert.risk,
                    alert.message
                );
            }
            AppEvent::PowerModeChanged { from, to, .. } => {
                log!(level, "POWER | t={}ms {} -> {}", at, from, to);
            }
            AppEvent::SyncFailed { error, .. } => {
                log!(level, "SYNC  | t={}ms failed: {}", at, error);
            }
            AppEvent::HealthChanged { health, .. } => {
                log!(level, "HEALTH| t={}ms {:?}", at, health);
            }
            AppEvent::Restarted { .. } => {
                log!(level, "START | t={}ms state re-initialised", at);
            }
            AppEvent::ConfigRejected { reason, .. } => {
                log!(level, "CONF  | t={}ms update rejected: {}", at, reason);
            }
        }
    }
}
