//! Mock adapters for integration tests.
//!
//! Record every indicator call and broadcast payload so tests can assert
//! on the full history without touching real pins or radios.

use std::cell::RefCell;
use std::collections::VecDeque;

use envnode::app::events::AppEvent;
use envnode::app::ports::{
    BroadcastPort, ConfigError, ConfigPort, EventSink, IndicatorPort, ModelOutput, ModelPort,
    SensorPort,
};
use envnode::app::service::NodeHealth;
use envnode::config::SystemConfig;
use envnode::error::{CommsError, InferenceError, SensorError};
use envnode::power::PowerMode;
use envnode::reading::{FEATURE_COUNT, Reading};

// ── Indicator call record ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorCall {
    Escalation(bool),
    Health(NodeHealth),
    Mode(PowerMode),
}

// ── MockHardware ──────────────────────────────────────────────

/// Returns scripted readings in order, then repeats `fallback`.
pub struct MockHardware {
    pub script: VecDeque<Result<Reading, SensorError>>,
    pub fallback: Result<Reading, SensorError>,
    pub reads: usize,
    pub calls: Vec<IndicatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(fallback: Reading) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: Ok(fallback),
            reads: 0,
            calls: Vec::new(),
        }
    }

    pub fn push(&mut self, next: Result<Reading, SensorError>) {
        self.script.push_back(next);
    }

    pub fn escalated(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                IndicatorCall::Escalation(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn modes_shown(&self) -> Vec<PowerMode> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                IndicatorCall::Mode(m) => Some(*m),
                _ => None,
            })
            .collect()
    }
}

impl SensorPort for MockHardware {
    fn read(&mut self, now_ms: u64) -> Result<Reading, SensorError> {
        self.reads += 1;
        let next = self.script.pop_front().unwrap_or(self.fallback);
        next.map(|r| Reading {
            timestamp_ms: now_ms,
            ..r
        })
    }
}

impl IndicatorPort for MockHardware {
    fn set_escalation(&mut self, engaged: bool) {
        self.calls.push(IndicatorCall::Escalation(engaged));
    }

    fn show_health(&mut self, health: NodeHealth) {
        self.calls.push(IndicatorCall::Health(health));
    }

    fn show_power_mode(&mut self, mode: PowerMode) {
        self.calls.push(IndicatorCall::Mode(mode));
    }
}

// ── MockModel ─────────────────────────────────────────────────

/// Model whose outputs are scripted per invocation.
pub struct MockModel {
    pub outputs: VecDeque<Result<f32, InferenceError>>,
    pub inputs: Vec<[f32; FEATURE_COUNT]>,
}

#[allow(dead_code)]
impl MockModel {
    pub fn new(outputs: impl IntoIterator<Item = Result<f32, InferenceError>>) -> Self {
        Self {
            outputs: outputs.into_iter().collect(),
            inputs: Vec::new(),
        }
    }
}

impl ModelPort for MockModel {
    fn invoke(&mut self, input: &[f32; FEATURE_COUNT]) -> Result<ModelOutput, InferenceError> {
        self.inputs.push(*input);
        let risk = self
            .outputs
            .pop_front()
            .unwrap_or(Err(InferenceError::InvokeFailed))?;
        let mut out = ModelOutput::new();
        out.push(risk).map_err(|_| InferenceError::BadOutput)?;
        Ok(out)
    }
}

// ── MockLink ──────────────────────────────────────────────────

pub struct MockLink {
    pub connected: bool,
    pub sent: Vec<Vec<u8>>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self {
            connected: true,
            sent: Vec::new(),
        }
    }

    pub fn last_json(&self) -> Option<serde_json::Value> {
        self.sent
            .last()
            .and_then(|p| serde_json::from_slice(p).ok())
    }
}

impl BroadcastPort for MockLink {
    fn broadcast(&mut self, payload: &[u8]) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::NoPeers);
        }
        self.sent.push(payload.to_vec());
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockNvs ───────────────────────────────────────────────────

pub struct MockNvs {
    pub saved: RefCell<Vec<SystemConfig>>,
    pub fail: bool,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self {
            saved: RefCell::new(Vec::new()),
            fail: false,
        }
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        Ok(self.saved.borrow().last().cloned().unwrap_or_default())
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        if self.fail {
            return Err(ConfigError::IoError);
        }
        self.saved.borrow_mut().push(config.clone());
        Ok(())
    }
}

// ── Reading fixtures ──────────────────────────────────────────

/// In-bounds, benign reading on a healthy battery with no sun.
#[allow(dead_code)]
pub fn calm() -> Reading {
    Reading {
        temperature_c: 22.0,
        humidity_pct: 45.0,
        voc_index: 80.0,
        co2_ppm: 550.0,
        battery_v: 4.0,
        solar_v: 0.0,
        ..Reading::default()
    }
}

/// In-bounds reading that violates every rule (risk 1.0).
#[allow(dead_code)]
pub fn hazardous() -> Reading {
    Reading {
        temperature_c: -5.0,
        humidity_pct: 90.0,
        voc_index: 300.0,
        co2_ppm: 2_000.0,
        ..calm()
    }
}
