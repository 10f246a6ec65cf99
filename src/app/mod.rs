//! Application core: pure domain logic, zero I/O.
//!
//! This module wires the sensing pipeline together: scheduling, validation,
//! risk classification, alerting, power management and telemetry.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
