//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (radio peers,
//! serial console, button) that the
//! [`NodeService`](super::service::NodeService) interprets and acts upon.

use crate::config::SystemConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Re-initialise all runtime state (schedule, latest data, alert
    /// history, power governor) as if freshly powered on.
    Restart,

    /// Hot-reload configuration.
    UpdateConfig(SystemConfig),

    /// Persist the current config on the next auto-save check.
    SaveConfig,

    /// Zero the diagnostics counters.
    ClearDiagnostics,
}
