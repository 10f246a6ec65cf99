//! Application service: the hexagonal core.
//!
//! [`NodeService`] owns the scheduler, validator, classifier, alert gate
//! and power governor, plus the latest reading and assessment.  It exposes
//! a clean, hardware-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!     SensorPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                    │         NodeService          │
//!  IndicatorPort ◀── │  Scheduler · Validator ·     │ ──▶ BroadcastPort
//!                    │  Classifier · Gate · Power   │
//!                    └─────────────────────────────┘
//! ```
//!
//! Every task failure is handled inside the tick and becomes a skipped
//! cycle.  Nothing propagates out of [`NodeService::tick`].

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::alert::{Alert, AlertGate};
use crate::config::{SystemConfig, validate_config};
use crate::diagnostics::RuntimeMetrics;
use crate::error::CommsError;
use crate::inference::{NoModel, RiskAssessment, RiskClassifier};
use crate::power::{IntervalSet, PowerGovernor, PowerMode, PowerTelemetry};
use crate::reading::Reading;
use crate::scheduler::{ScheduleState, TaskScheduler, TaskSet};
use crate::validation::SampleValidator;

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{
    BroadcastPort, ConfigError, ConfigPort, EventSink, IndicatorPort, ModelPort, SensorPort,
    TaskDelegate,
};

/// Mode the node runs in until the first power check.
pub const INITIAL_MODE: PowerMode = PowerMode::Normal;

/// Maximum number of registered alert callbacks.
pub const MAX_ALERT_LISTENERS: usize = 4;

/// Quiet period after the last config change before auto-save.
const CONFIG_SAVE_DEBOUNCE_MS: u64 = 5_000;

/// Callback invoked for every alert that passes the gate.
pub type AlertListener = Box<dyn FnMut(&Alert)>;

// ───────────────────────────────────────────────────────────────
// Health
// ───────────────────────────────────────────────────────────────

/// Overall node health, surfaced on the local indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeHealth {
    /// All subsystems up.
    Nominal,
    /// A subsystem failed at bring-up but has a fallback.
    Degraded(&'static str),
    /// A subsystem with no fallback failed; the scheduler no longer runs.
    Halted(&'static str),
}

/// Bring-up outcome: which subsystems failed, and whether any of them
/// had no fallback.
#[derive(Debug, Clone, Default)]
pub struct InitReport {
    degraded: heapless::Vec<&'static str, 4>,
    fatal: Option<&'static str>,
}

impl InitReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A subsystem failed but a fallback is in use.
    pub fn degrade(&mut self, reason: &'static str) {
        warn!("Init: degraded: {}", reason);
        // Past capacity the first reasons are the ones worth showing.
        let _ = self.degraded.push(reason);
    }

    /// A subsystem with no fallback failed.
    pub fn fail(&mut self, reason: &'static str) {
        error!("Init: fatal: {}", reason);
        self.fatal.get_or_insert(reason);
    }

    pub fn degraded(&self) -> &[&'static str] {
        &self.degraded
    }

    /// Health implied by the report; a fatal failure outranks degradations.
    pub fn health(&self) -> NodeHealth {
        match (self.fatal, self.degraded.first()) {
            (Some(reason), _) => NodeHealth::Halted(reason),
            (None, Some(reason)) => NodeHealth::Degraded(reason),
            (None, None) => NodeHealth::Nominal,
        }
    }
}

/// Consistent (reading, assessment, mode) triple for status handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub reading: Option<Reading>,
    pub assessment: Option<RiskAssessment>,
    pub mode: PowerMode,
}

// ───────────────────────────────────────────────────────────────
// Core state (everything the task callbacks touch)
// ───────────────────────────────────────────────────────────────

struct NodeCore<M> {
    config: SystemConfig,
    validator: SampleValidator,
    classifier: RiskClassifier<M>,
    gate: AlertGate,
    governor: PowerGovernor,
    mode: PowerMode,
    latest_reading: Option<Reading>,
    latest_assessment: Option<RiskAssessment>,
    escalated: bool,
    health: NodeHealth,
    metrics: RuntimeMetrics,
    listeners: heapless::Vec<AlertListener, MAX_ALERT_LISTENERS>,
}

impl<M: ModelPort> NodeCore<M> {
    fn telemetry(&self, now_ms: u64) -> TelemetryData {
        TelemetryData {
            at_ms: now_ms,
            mode: self.mode,
            health: self.health,
            strategy: self.classifier.strategy_name(),
            reading: self.latest_reading,
            assessment: self.latest_assessment,
            escalated: self.escalated,
            metrics: self.metrics,
        }
    }

    fn infer_interval_ms(&self) -> u64 {
        self.governor.profile().intervals_for(self.mode).infer_ms
    }
}

/// One tick's view of the core plus the adapters it may call.
struct Cycle<'a, M, H, L, E> {
    core: &'a mut NodeCore<M>,
    hw: &'a mut H,
    link: &'a mut L,
    sink: &'a mut E,
}

impl<M, H, L, E> TaskDelegate for Cycle<'_, M, H, L, E>
where
    M: ModelPort,
    H: SensorPort + IndicatorPort,
    L: BroadcastPort,
    E: EventSink,
{
    fn run_sense(&mut self, now_ms: u64) -> bool {
        let core = &mut *self.core;
        match self.hw.read(now_ms) {
            Ok(mut reading) => {
                let faults = core.validator.stamp(&mut reading);
                core.latest_reading = Some(reading);
                if faults != 0 {
                    core.metrics.record_rejected_reading();
                    info!("Reading rejected: faults=0b{:08b}", faults);
                    self.sink.emit(&AppEvent::ReadingRejected { faults, at_ms: now_ms });
                }
                reading.valid
            }
            Err(e) => {
                core.metrics.record_sensor_failure();
                warn!("Sensor read failed: {}", e);
                self.sink.emit(&AppEvent::SensorFailed { error: e, at_ms: now_ms });
                false
            }
        }
    }

    fn run_infer(&mut self, now_ms: u64) {
        let core = &mut *self.core;
        let Some(reading) = core.latest_reading.filter(|r| r.valid) else {
            return;
        };

        let assessment = match core.classifier.classify(&reading.features()) {
            Ok(a) => a,
            Err(e) => {
                core.metrics.record_inference_failure();
                error!("Inference skipped: {}", e);
                self.sink.emit(&AppEvent::InferenceFailed { error: e, at_ms: now_ms });
                return;
            }
        };

        core.latest_assessment = Some(assessment);
        debug!(
            "Assessed risk={:.2} ({}) conf={:.2}",
            assessment.environmental_risk, assessment.category, assessment.confidence
        );
        self.sink.emit(&AppEvent::Assessed { assessment, at_ms: now_ms });

        let suppressed_before = core.gate.suppressed();
        let infer_ms = core.infer_interval_ms();
        match core.gate.evaluate(&assessment, now_ms, infer_ms) {
            Some(alert) => {
                core.metrics.record_alert();
                for listener in core.listeners.iter_mut() {
                    listener(&alert);
                }
                self.sink.emit(&AppEvent::Alert(alert));
                if !core.escalated {
                    self.hw.set_escalation(true);
                    core.escalated = true;
                }
            }
            None => {
                if core.gate.suppressed() > suppressed_before {
                    core.metrics.record_suppressed_alert();
                }
                if core.escalated && assessment.environmental_risk <= core.config.alert_threshold {
                    info!("Risk back below threshold, releasing escalation");
                    self.hw.set_escalation(false);
                    core.escalated = false;
                }
            }
        }
    }

    fn run_sync(&mut self, now_ms: u64) {
        let core = &mut *self.core;
        let telemetry = core.telemetry(now_ms);
        let result = serde_json::to_vec(&telemetry)
            .map_err(|_| CommsError::EncodeFailed)
            .and_then(|payload| self.link.broadcast(&payload));

        if let Err(e) = result {
            core.metrics.record_sync_failure();
            warn!("Telemetry sync failed: {}", e);
            self.sink.emit(&AppEvent::SyncFailed { error: e, at_ms: now_ms });
        }
    }

    fn run_power_check(&mut self, now_ms: u64) -> Option<IntervalSet> {
        let core = &mut *self.core;
        let Some(reading) = core.latest_reading else {
            debug!("Power check: no reading yet, keeping {}", core.mode);
            return None;
        };

        let telemetry = PowerTelemetry::from_reading(&reading, &core.config);
        let (mode, intervals) = core.governor.update(telemetry);
        if mode == core.mode {
            return None;
        }

        let from = core.mode;
        core.mode = mode;
        core.metrics.record_mode_change();
        self.hw.show_power_mode(mode);
        self.sink.emit(&AppEvent::PowerModeChanged { from, to: mode, at_ms: now_ms });
        Some(intervals)
    }
}

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct NodeService<M = NoModel> {
    scheduler: TaskScheduler,
    core: NodeCore<M>,
    config_dirty: bool,
    dirty_since_ms: u64,
}

impl<M: ModelPort> NodeService<M> {
    /// Construct the service.  Timing counts from `now_ms`.
    ///
    /// Does **not** announce itself; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, classifier: RiskClassifier<M>, now_ms: u64) -> Self {
        let governor = PowerGovernor::new(&config);
        let intervals = governor.profile().intervals_for(INITIAL_MODE);
        let scheduler = TaskScheduler::new(
            now_ms,
            intervals,
            config.sync_interval_ms,
            config.power_check_interval_ms,
        );
        let core = NodeCore {
            validator: SampleValidator::new(config.bounds),
            classifier,
            gate: AlertGate::new(config.alert_threshold, config.alert_cooldown_ms),
            governor,
            mode: INITIAL_MODE,
            latest_reading: None,
            latest_assessment: None,
            escalated: false,
            health: NodeHealth::Nominal,
            metrics: RuntimeMetrics::new(),
            listeners: heapless::Vec::new(),
            config,
        };

        Self {
            scheduler,
            core,
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the service and paint the initial indicator state.
    pub fn start(&mut self, now_ms: u64, hw: &mut impl IndicatorPort, sink: &mut impl EventSink) {
        hw.show_health(self.core.health);
        hw.show_power_mode(self.core.mode);
        sink.emit(&AppEvent::Started {
            mode: self.core.mode,
            strategy: self.core.classifier.strategy_name(),
            at_ms: now_ms,
        });
        info!(
            "NodeService started: mode={} strategy={}",
            self.core.mode,
            self.core.classifier.strategy_name()
        );
    }

    /// Run one scheduler tick: every due task, in priority order.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`IndicatorPort`], which avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + IndicatorPort),
        link: &mut impl BroadcastPort,
        sink: &mut impl EventSink,
    ) -> TaskSet {
        if matches!(self.core.health, NodeHealth::Halted(_)) {
            return TaskSet::default();
        }

        let mut cycle = Cycle {
            core: &mut self.core,
            hw,
            link,
            sink,
        };
        let ran = self.scheduler.tick(now_ms, &mut cycle);
        self.core.metrics.record_tick(ran);
        ran
    }

    /// Re-initialise all runtime state as if freshly powered on.
    ///
    /// Health is kept: a degraded or halted subsystem is still degraded
    /// or halted after a state reset.
    pub fn restart(&mut self, now_ms: u64, hw: &mut impl IndicatorPort, sink: &mut impl EventSink) {
        let core = &mut self.core;
        core.mode = INITIAL_MODE;
        core.governor.reset();
        core.gate.reset();
        core.latest_reading = None;
        core.latest_assessment = None;
        if core.escalated {
            hw.set_escalation(false);
            core.escalated = false;
        }
        core.metrics.record_restart();
        self.scheduler
            .reset(now_ms, core.governor.profile().intervals_for(INITIAL_MODE));

        hw.show_power_mode(INITIAL_MODE);
        sink.emit(&AppEvent::Restarted { at_ms: now_ms });
        info!("NodeService restarted at {}ms", now_ms);
    }

    // ── Health ────────────────────────────────────────────────

    /// Apply the bring-up report: halt, degrade, or leave nominal.
    pub fn apply_init_report(
        &mut self,
        report: &InitReport,
        now_ms: u64,
        hw: &mut impl IndicatorPort,
        sink: &mut impl EventSink,
    ) {
        match report.health() {
            NodeHealth::Nominal => {}
            NodeHealth::Degraded(reason) => self.mark_degraded(reason, now_ms, hw, sink),
            NodeHealth::Halted(reason) => self.halt(reason, now_ms, hw, sink),
        }
    }

    /// Record a bring-up failure that has a fallback.
    pub fn mark_degraded(
        &mut self,
        reason: &'static str,
        now_ms: u64,
        hw: &mut impl IndicatorPort,
        sink: &mut impl EventSink,
    ) {
        if matches!(self.core.health, NodeHealth::Halted(_)) {
            return;
        }
        self.set_health(NodeHealth::Degraded(reason), now_ms, hw, sink);
    }

    /// Stop scheduling entirely and show the persistent error state.
    pub fn halt(
        &mut self,
        reason: &'static str,
        now_ms: u64,
        hw: &mut impl IndicatorPort,
        sink: &mut impl EventSink,
    ) {
        error!("Node halted: {}", reason);
        self.set_health(NodeHealth::Halted(reason), now_ms, hw, sink);
    }

    fn set_health(
        &mut self,
        health: NodeHealth,
        now_ms: u64,
        hw: &mut impl IndicatorPort,
        sink: &mut impl EventSink,
    ) {
        self.core.health = health;
        hw.show_health(health);
        sink.emit(&AppEvent::HealthChanged { health, at_ms: now_ms });
    }

    /// Account for a tick that overran the shortest task interval.
    pub fn record_overrun(&mut self) {
        self.core.metrics.record_overrun();
    }

    // ── Alert listeners ───────────────────────────────────────

    /// Register an alert callback.  Returns the slot index, or `None` if full.
    pub fn on_alert(&mut self, listener: impl FnMut(&Alert) + 'static) -> Option<usize> {
        let slot = self.core.listeners.len();
        self.core.listeners.push(Box::new(listener)).ok()?;
        Some(slot)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (radio peer, console, button).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        hw: &mut impl IndicatorPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::Restart => self.restart(now_ms, hw, sink),
            AppCommand::UpdateConfig(new_config) => match validate_config(&new_config) {
                Ok(()) => {
                    self.apply_config(new_config);
                    self.mark_config_dirty(now_ms);
                    info!("Configuration updated at runtime");
                }
                Err(ConfigError::ValidationFailed(reason)) => self.reject_config(reason, now_ms, sink),
                Err(_) => self.reject_config("unreadable config", now_ms, sink),
            },
            AppCommand::SaveConfig => {
                // Backdate the stamp so the next auto-save check flushes.
                self.config_dirty = true;
                self.dirty_since_ms = now_ms.saturating_sub(CONFIG_SAVE_DEBOUNCE_MS);
                info!("Explicit config save requested (will flush on next auto-save check)");
            }
            AppCommand::ClearDiagnostics => {
                self.core.metrics = RuntimeMetrics::new();
            }
        }
    }

    fn reject_config(&mut self, reason: &'static str, now_ms: u64, sink: &mut impl EventSink) {
        warn!("Config update rejected: {}", reason);
        sink.emit(&AppEvent::ConfigRejected { reason, at_ms: now_ms });
    }

    fn apply_config(&mut self, config: SystemConfig) {
        let core = &mut self.core;
        if config.classifier != core.config.classifier {
            info!("Classifier strategy change takes effect after reboot");
        }
        core.validator = SampleValidator::new(config.bounds);
        core.gate.set_policy(config.alert_threshold, config.alert_cooldown_ms);
        core.governor.reconfigure(&config);
        self.scheduler
            .set_fixed_intervals(config.sync_interval_ms, config.power_check_interval_ms);
        self.scheduler
            .set_intervals(core.governor.profile().intervals_for(core.mode));
        core.config = config;
    }

    // ── Queries ───────────────────────────────────────────────

    /// Latest reading (valid or not), if any.
    pub fn current_reading(&self) -> Option<Reading> {
        self.core.latest_reading
    }

    /// Latest successful assessment, if any.
    pub fn current_assessment(&self) -> Option<RiskAssessment> {
        self.core.latest_assessment
    }

    pub fn current_power_mode(&self) -> PowerMode {
        self.core.mode
    }

    /// Reading, assessment and mode captured together.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            reading: self.core.latest_reading,
            assessment: self.core.latest_assessment,
            mode: self.core.mode,
        }
    }

    /// Build a telemetry snapshot from the current state.
    pub fn build_telemetry(&self, now_ms: u64) -> TelemetryData {
        self.core.telemetry(now_ms)
    }

    pub fn intervals(&self) -> IntervalSet {
        self.scheduler.intervals()
    }

    pub fn schedule_state(&self) -> &ScheduleState {
        self.scheduler.state()
    }

    /// Milliseconds until the next task is due.
    pub fn next_due_in(&self, now_ms: u64) -> u64 {
        self.scheduler.next_due_in(now_ms)
    }

    pub fn health(&self) -> NodeHealth {
        self.core.health
    }

    pub fn is_escalated(&self) -> bool {
        self.core.escalated
    }

    pub fn metrics(&self) -> &RuntimeMetrics {
        &self.core.metrics
    }

    pub fn strategy_name(&self) -> &'static str {
        self.core.classifier.strategy_name()
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.core.config.clone()
    }

    /// Longest a tick may take before it counts as an overrun.  Follows
    /// the live config, so a hot reload retunes it.
    pub fn overrun_budget_ms(&self) -> u64 {
        self.core.config.shortest_interval_ms()
    }

    pub fn idle_slice_ms(&self) -> u32 {
        self.core.config.idle_slice_ms
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified.
    pub fn mark_config_dirty(&mut self, now_ms: u64) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_ms = now_ms;
        }
    }

    /// Save once the config has been quiet for the debounce period.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, now_ms: u64, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if now_ms.saturating_sub(self.dirty_since_ms) < CONFIG_SAVE_DEBOUNCE_MS {
            return false;
        }
        match storage.save(&self.core.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    /// Force-save if dirty (call before a reboot).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.core.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config force-saved before shutdown");
            }
            Err(e) => {
                warn!("Config force-save failed: {}", e);
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}
