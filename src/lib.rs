//! Environmental sensing node library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod alert;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod inference;
pub mod power;
pub mod reading;
pub mod scheduler;
pub mod validation;

pub mod adapters;
pub mod drivers;
