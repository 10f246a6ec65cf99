//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService (domain)
//! ```
//!
//! Driven adapters (sensors, model runtime, radio, indicators, storage)
//! implement these traits.  The [`NodeService`](super::service::NodeService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use crate::config::SystemConfig;
use crate::error::{CommsError, InferenceError, SensorError};
use crate::power::{IntervalSet, PowerMode};
use crate::reading::{FEATURE_COUNT, Reading};

use super::service::NodeHealth;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per sensing cycle.
pub trait SensorPort {
    /// Read every sensor and return an unvalidated reading stamped `now_ms`.
    fn read(&mut self, now_ms: u64) -> Result<Reading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Model port (driven adapter: domain → inference runtime)
// ───────────────────────────────────────────────────────────────

/// Upper bound on model output tensor length.
pub const MAX_MODEL_OUTPUTS: usize = 4;

/// Fixed-capacity output tensor.
pub type ModelOutput = heapless::Vec<f32, MAX_MODEL_OUTPUTS>;

/// A loaded model with one 6-float input tensor and one output tensor.
pub trait ModelPort {
    fn invoke(&mut self, input: &[f32; FEATURE_COUNT]) -> Result<ModelOutput, InferenceError>;
}

// ───────────────────────────────────────────────────────────────
// Broadcast port (driven adapter: domain → connected peers)
// ───────────────────────────────────────────────────────────────

/// Deliver an already-serialised payload to every connected peer.
pub trait BroadcastPort {
    fn broadcast(&mut self, payload: &[u8]) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → LED / buzzer)
// ───────────────────────────────────────────────────────────────

/// Local visual/audible indicators.
pub trait IndicatorPort {
    /// Engage or release the emergency escalation indicator.
    fn set_escalation(&mut self, engaged: bool);

    /// Show node health (nominal, degraded, halted).
    fn show_health(&mut self, health: NodeHealth);

    /// Show the active power mode.
    fn show_power_mode(&mut self, mode: PowerMode);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Every event carries a level and a timestamp;
/// adapters decide where they go (serial log, flash log, radio).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage (config blobs, model weights).
///
/// Keys are namespaced to prevent collisions between subsystems.
/// Write operations MUST be atomic: no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Task delegate (decouples scheduler from the components it drives)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the [`TaskScheduler`](crate::scheduler::TaskScheduler)
/// invokes for each due task, in fixed priority order.
///
/// The scheduler knows nothing about sensors, models or radios; it only
/// knows when each slot is due.  Implementations must not fail: every
/// task-level error is handled inside the callback.
pub trait TaskDelegate {
    /// Take a reading.  Returns `true` when it passed validation.
    fn run_sense(&mut self, now_ms: u64) -> bool;

    /// Classify the latest valid reading.
    fn run_infer(&mut self, now_ms: u64);

    /// Publish telemetry.
    fn run_sync(&mut self, now_ms: u64);

    /// Re-evaluate the power mode.  Returns the new intervals if they changed.
    fn run_power_check(&mut self, now_ms: u64) -> Option<IntervalSet>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Stored blob is larger than the caller's buffer.
    TooLarge,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::TooLarge => write!(f, "blob larger than buffer"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
