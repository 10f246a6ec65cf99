//! Unified error types for the node firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the top-level control loop's error handling uniform.  All variants are
//! `Copy` so they can be passed through the scheduler and service without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read.
    Sensor(SensorError),
    /// A reading violated one or more physical bounds (fault bitmask).
    Validation(u8),
    /// The learned model could not be loaded or invoked.
    Inference(InferenceError),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Subsystem initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Validation(mask) => write!(f, "validation: faults=0b{mask:08b}"),
            Self::Inference(e) => write!(f, "inference: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C/SPI bus transaction failed or timed out.
    BusFailed,
    /// ADC read (battery / solar rails) failed.
    AdcReadFailed,
    /// Sensor has not finished its warm-up period.
    WarmingUp,
    /// Sensor is not present on the bus.
    NotPresent,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFailed => write!(f, "bus transaction failed"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::WarmingUp => write!(f, "sensor warming up"),
            Self::NotPresent => write!(f, "sensor not present"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceError {
    /// No model artifact is loaded.
    ModelMissing,
    /// Model artifact failed to load or allocate its tensor arena.
    LoadFailed,
    /// The interpreter returned an error while invoking the model.
    InvokeFailed,
    /// The model produced an empty or non-finite output.
    BadOutput,
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelMissing => write!(f, "model missing"),
            Self::LoadFailed => write!(f, "model load failed"),
            Self::InvokeFailed => write!(f, "model invocation failed"),
            Self::BadOutput => write!(f, "model output invalid"),
        }
    }
}

impl From<InferenceError> for Error {
    fn from(e: InferenceError) -> Self {
        Self::Inference(e)
    }
}

// ---------------------------------------------------------------------------
// Validation faults
// ---------------------------------------------------------------------------

/// One bit per bounded field.  A rejected reading carries the OR of every
/// bound it violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValidationFault {
    TemperatureOutOfRange = 0b0000_0001,
    HumidityOutOfRange = 0b0000_0010,
    Co2OutOfRange = 0b0000_0100,
    VocOutOfRange = 0b0000_1000,
}

impl ValidationFault {
    pub const ALL: [Self; 4] = [
        Self::TemperatureOutOfRange,
        Self::HumidityOutOfRange,
        Self::Co2OutOfRange,
        Self::VocOutOfRange,
    ];

    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemperatureOutOfRange => write!(f, "temperature out of range"),
            Self::HumidityOutOfRange => write!(f, "humidity out of range"),
            Self::Co2OutOfRange => write!(f, "CO2 out of range"),
            Self::VocOutOfRange => write!(f, "VOC index out of range"),
        }
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// No peer is connected to receive the payload.
    NoPeers,
    /// Transport rejected or dropped the payload.
    SendFailed,
    /// Payload could not be encoded.
    EncodeFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPeers => write!(f, "no connected peers"),
            Self::SendFailed => write!(f, "send failed"),
            Self::EncodeFailed => write!(f, "payload encode failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
