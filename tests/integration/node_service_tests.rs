//! Integration tests for the NodeService → scheduler → ports pipeline.
//!
//! These run on the host (x86_64) and drive the service with synthetic
//! timestamps, so a simulated hour takes microseconds.

use std::cell::RefCell;
use std::rc::Rc;

use envnode::app::commands::AppCommand;
use envnode::app::events::AppEvent;
use envnode::app::service::{NodeHealth, NodeService};
use envnode::config::SystemConfig;
use envnode::error::{CommsError, InferenceError, SensorError};
use envnode::inference::{NoModel, RiskCategory, RiskClassifier};
use envnode::power::{IntervalSet, PowerMode};
use envnode::reading::Reading;
use envnode::scheduler::TaskId;

use crate::mock_hw::{
    IndicatorCall, MockHardware, MockLink, MockModel, MockNvs, RecordingSink, calm, hazardous,
};

struct Rig<M: envnode::app::ports::ModelPort = NoModel> {
    node: NodeService<M>,
    hw: MockHardware,
    link: MockLink,
    sink: RecordingSink,
}

impl<M: envnode::app::ports::ModelPort> Rig<M> {
    fn with(config: SystemConfig, classifier: RiskClassifier<M>, reading: Reading) -> Self {
        let mut rig = Self {
            node: NodeService::new(config, classifier, 0),
            hw: MockHardware::new(reading),
            link: MockLink::new(),
            sink: RecordingSink::new(),
        };
        rig.node.start(0, &mut rig.hw, &mut rig.sink);
        rig
    }

    fn tick(&mut self, now_ms: u64) -> envnode::scheduler::TaskSet {
        self.node
            .tick(now_ms, &mut self.hw, &mut self.link, &mut self.sink)
    }

    /// Tick every `step_ms` over `(from, to]`.
    fn run(&mut self, from: u64, to: u64, step_ms: u64) {
        let mut now = from + step_ms;
        while now <= to {
            self.tick(now);
            now += step_ms;
        }
    }

    fn alerts(&self) -> Vec<f32> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Alert(a) => Some(a.risk),
                _ => None,
            })
            .collect()
    }
}

fn rules(reading: Reading) -> Rig {
    Rig::with(SystemConfig::default(), RiskClassifier::RuleBased, reading)
}

// ── Alerting ──────────────────────────────────────────────────

#[test]
fn hazardous_reading_raises_alert_and_escalates() {
    let mut rig = rules(hazardous());
    rig.run(0, 10_000, 50);

    assert_eq!(rig.alerts(), vec![1.0]);
    assert!(rig.hw.escalated());
    assert!(rig.node.is_escalated());
    let a = rig.node.current_assessment().expect("assessed");
    assert_eq!(a.category, RiskCategory::Critical);
    assert!((a.confidence - 0.8).abs() < 1e-6);
    assert_eq!(rig.node.metrics().alerts_fired, 1);
}

#[test]
fn cooldown_suppresses_repeat_alerts() {
    let config = SystemConfig {
        alert_cooldown_ms: Some(60_000),
        ..SystemConfig::default()
    };
    let mut rig: Rig = Rig::with(config, RiskClassifier::RuleBased, hazardous());
    rig.run(0, 70_000, 1_000);

    // Infers at 10k..70k: fires at 10k and 70k, suppressed in between.
    assert_eq!(rig.alerts().len(), 2);
    assert_eq!(rig.node.metrics().alerts_suppressed, 5);
    assert!(rig.node.is_escalated());
}

#[test]
fn default_cooldown_allows_one_alert_per_infer_interval() {
    let mut rig = rules(hazardous());
    rig.run(0, 30_000, 1_000);
    assert_eq!(rig.alerts().len(), 3);
    assert_eq!(rig.node.metrics().alerts_suppressed, 0);
}

#[test]
fn risk_at_threshold_does_not_alert() {
    let model = MockModel::new([Ok(0.8), Ok(0.81)]);
    let mut rig = Rig::with(SystemConfig::default(), RiskClassifier::Learned(model), calm());

    rig.run(0, 10_000, 1_000);
    assert!(rig.alerts().is_empty());
    let a = rig.node.current_assessment().unwrap();
    assert_eq!(a.category, RiskCategory::Warning);
    assert!((a.confidence - 0.95).abs() < 1e-6);

    rig.run(10_000, 20_000, 1_000);
    assert_eq!(rig.alerts(), vec![0.81]);
}

#[test]
fn escalation_releases_when_risk_falls() {
    let mut rig = rules(hazardous());
    rig.run(0, 10_000, 1_000);
    assert!(rig.hw.escalated());

    rig.hw.fallback = Ok(calm());
    rig.run(10_000, 20_000, 1_000);
    assert!(!rig.hw.escalated());
    assert!(!rig.node.is_escalated());
    assert_eq!(
        rig.node.current_assessment().unwrap().category,
        RiskCategory::Normal
    );
}

#[test]
fn alert_listeners_see_every_alert() {
    let mut rig = rules(hazardous());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    assert_eq!(
        rig.node.on_alert(move |a| sink.borrow_mut().push((a.timestamp_ms, a.severity))),
        Some(0)
    );

    rig.run(0, 20_000, 1_000);
    assert_eq!(
        *seen.borrow(),
        vec![(10_000, RiskCategory::Critical), (20_000, RiskCategory::Critical)]
    );
}

// ── Validation gating ─────────────────────────────────────────

#[test]
fn invalid_reading_skips_inference_until_a_valid_one() {
    let mut rig = rules(calm());
    rig.hw.push(Ok(calm()));
    rig.hw.push(Ok(Reading {
        temperature_c: 90.0,
        ..calm()
    }));

    // t=10s: sense gets the out-of-range reading, infer is skipped.
    rig.tick(5_000);
    let ran = rig.tick(10_000);
    assert!(ran.contains(TaskId::Sense));
    assert!(!ran.contains(TaskId::Infer));
    assert!(rig.node.current_assessment().is_none());
    assert!(!rig.node.current_reading().unwrap().valid);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ReadingRejected { faults: 0b0001, .. })),
        1
    );

    // Next valid reading: infer is still due and runs in the same tick.
    let ran = rig.tick(15_000);
    assert!(ran.contains(TaskId::Infer));
    assert!(rig.node.current_assessment().is_some());
    assert_eq!(rig.node.metrics().rejected_readings, 1);
}

#[test]
fn warm_but_valid_reading_is_assessed() {
    let mut rig = rules(Reading {
        temperature_c: 45.0,
        ..calm()
    });
    rig.run(0, 10_000, 5_000);
    let r = rig.node.current_reading().unwrap();
    assert!(r.valid);
    let a = rig.node.current_assessment().unwrap();
    assert!((a.environmental_risk - 0.3).abs() < 1e-6);
    assert_eq!(a.category, RiskCategory::Attention);
}

#[test]
fn sensor_failure_is_a_skipped_cycle() {
    let mut rig = rules(calm());
    rig.hw.push(Err(SensorError::BusFailed));
    rig.hw.push(Err(SensorError::BusFailed));

    rig.run(0, 10_000, 5_000);
    assert!(rig.node.current_reading().is_none());
    assert!(rig.node.current_assessment().is_none());
    assert_eq!(rig.node.metrics().sensor_failures, 2);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::SensorFailed { .. })),
        2
    );

    rig.run(10_000, 15_000, 5_000);
    assert!(rig.node.current_assessment().is_some());
}

// ── Inference failures ────────────────────────────────────────

#[test]
fn inference_failure_keeps_previous_assessment() {
    let model = MockModel::new([Ok(0.2), Err(InferenceError::InvokeFailed), Ok(0.6)]);
    let mut rig = Rig::with(SystemConfig::default(), RiskClassifier::Learned(model), calm());

    rig.run(0, 10_000, 5_000);
    assert_eq!(rig.node.current_assessment().unwrap().environmental_risk, 0.2);

    rig.run(10_000, 20_000, 5_000);
    assert_eq!(rig.node.current_assessment().unwrap().environmental_risk, 0.2);
    assert_eq!(rig.node.metrics().inference_failures, 1);
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::InferenceFailed {
                error: InferenceError::InvokeFailed,
                ..
            }
        )),
        1
    );

    rig.run(20_000, 30_000, 5_000);
    assert_eq!(rig.node.current_assessment().unwrap().category, RiskCategory::Warning);
}

// ── Power management ──────────────────────────────────────────

#[test]
fn low_battery_without_sun_enters_emergency() {
    // 3.18 V → 15 %, 1 V × 20 mA → 20 mW.
    let mut rig = rules(Reading {
        battery_v: 3.18,
        solar_v: 1.0,
        ..calm()
    });
    rig.run(0, 60_000, 1_000);

    assert_eq!(rig.node.current_power_mode(), PowerMode::Emergency);
    assert_eq!(rig.node.intervals(), IntervalSet::new(60_000, 300_000));
    assert_eq!(rig.hw.modes_shown(), vec![PowerMode::Normal, PowerMode::Emergency]);
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::PowerModeChanged {
                from: PowerMode::Normal,
                to: PowerMode::Emergency,
                ..
            }
        )),
        1
    );

    // New cadence applies from the next due-check, without catch-up.
    let reads = rig.hw.reads;
    rig.run(60_000, 119_000, 1_000);
    assert_eq!(rig.hw.reads, reads);
    rig.tick(120_000);
    assert_eq!(rig.hw.reads, reads + 1);
}

#[test]
fn strong_sun_overrides_low_battery() {
    let mut rig = rules(Reading {
        battery_v: 3.18,
        solar_v: 7.5,
        ..calm()
    });
    rig.run(0, 60_000, 1_000);
    assert_eq!(rig.node.current_power_mode(), PowerMode::HighPerformance);
    assert_eq!(rig.node.intervals(), IntervalSet::new(1_000, 5_000));
}

#[test]
fn healthy_battery_stays_normal() {
    let mut rig = rules(calm());
    rig.run(0, 180_000, 5_000);
    assert_eq!(rig.node.current_power_mode(), PowerMode::Normal);
    assert_eq!(rig.node.metrics().mode_changes, 0);
    assert_eq!(rig.node.metrics().power_checks, 3);
}

// ── Telemetry sync ────────────────────────────────────────────

#[test]
fn sync_broadcasts_json_status() {
    let mut rig = rules(hazardous());
    rig.run(0, 30_000, 5_000);

    assert_eq!(rig.link.sent.len(), 1);
    let json = rig.link.last_json().expect("valid JSON");
    assert_eq!(json["at_ms"], 30_000);
    assert_eq!(json["mode"], "Normal");
    assert_eq!(json["strategy"], "rule-based");
    assert_eq!(json["escalated"], true);
    assert_eq!(json["health"], "Nominal");
    assert_eq!(json["reading"]["timestamp_ms"], 30_000);
    assert_eq!(json["assessment"]["category"], "Critical");
    assert!(json["metrics"]["senses"].as_u64().unwrap() >= 5);
}

#[test]
fn sync_without_peers_is_counted_not_fatal() {
    let mut rig = rules(calm());
    rig.link.connected = false;
    rig.run(0, 60_000, 5_000);

    assert_eq!(rig.node.metrics().sync_failures, 2);
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::SyncFailed {
                error: CommsError::NoPeers,
                ..
            }
        )),
        2
    );
    assert!(rig.node.current_assessment().is_some());
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn restart_reinitialises_runtime_state() {
    let mut rig = rules(hazardous());
    rig.run(0, 60_000, 5_000);
    assert!(rig.node.current_assessment().is_some());

    rig.node.handle_command(AppCommand::Restart, 100_000, &mut rig.hw, &mut rig.sink);

    assert!(rig.node.current_reading().is_none());
    assert!(rig.node.current_assessment().is_none());
    assert!(!rig.node.is_escalated());
    assert!(!rig.hw.escalated());
    assert_eq!(rig.node.current_power_mode(), PowerMode::Normal);
    assert_eq!(rig.node.metrics().restarts, 1);
    assert_eq!(rig.node.schedule_state().last_sense_ms, 100_000);

    // Timing counts from the restart.
    assert!(rig.tick(104_999).is_empty());
    assert!(rig.tick(105_000).contains(TaskId::Sense));
    // Cooldown history was cleared: the next infer alerts immediately.
    let before = rig.alerts().len();
    rig.tick(110_000);
    assert_eq!(rig.alerts().len(), before + 1);
}

#[test]
fn degraded_node_keeps_running() {
    let mut rig = rules(calm());
    rig.node
        .mark_degraded("learned model unavailable", 0, &mut rig.hw, &mut rig.sink);

    assert_eq!(rig.node.health(), NodeHealth::Degraded("learned model unavailable"));
    assert!(
        rig.hw
            .calls
            .contains(&IndicatorCall::Health(NodeHealth::Degraded("learned model unavailable")))
    );
    rig.run(0, 10_000, 5_000);
    assert!(rig.node.current_assessment().is_some());
}

#[test]
fn halted_node_stops_scheduling() {
    let mut rig = rules(calm());
    rig.node.halt("sensor bus", 0, &mut rig.hw, &mut rig.sink);
    rig.node
        .mark_degraded("ignored once halted", 0, &mut rig.hw, &mut rig.sink);

    rig.run(0, 120_000, 5_000);
    assert_eq!(rig.hw.reads, 0);
    assert!(rig.link.sent.is_empty());
    assert_eq!(rig.node.health(), NodeHealth::Halted("sensor bus"));
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn update_config_applies_immediately_and_autosaves() {
    let mut rig = rules(calm());
    let nvs = MockNvs::new();

    let mut config = SystemConfig::default();
    config.intervals.normal = IntervalSet::new(2_000, 4_000);
    config.alert_threshold = 0.7;
    rig.node.handle_command(
        AppCommand::UpdateConfig(config.clone()),
        1_000,
        &mut rig.hw,
        &mut rig.sink,
    );

    assert_eq!(rig.node.intervals(), IntervalSet::new(2_000, 4_000));
    assert!(rig.node.is_config_dirty());
    assert!(!rig.node.auto_save_if_needed(5_999, &nvs));
    assert!(rig.node.auto_save_if_needed(6_000, &nvs));
    assert!(!rig.node.is_config_dirty());
    assert_eq!(nvs.saved.borrow().as_slice(), &[config]);

    rig.run(0, 4_000, 1_000);
    assert_eq!(rig.hw.reads, 2);
}

#[test]
fn overrun_budget_follows_reloaded_config() {
    let mut rig = rules(calm());
    assert_eq!(rig.node.overrun_budget_ms(), 1_000);
    assert_eq!(rig.node.idle_slice_ms(), 50);

    let mut config = SystemConfig::default();
    config.intervals.high_performance = IntervalSet::new(500, 2_000);
    config.idle_slice_ms = 20;
    rig.node
        .handle_command(AppCommand::UpdateConfig(config), 0, &mut rig.hw, &mut rig.sink);

    assert_eq!(rig.node.overrun_budget_ms(), 500);
    assert_eq!(rig.node.idle_slice_ms(), 20);
}

#[test]
fn failed_save_stays_dirty() {
    let mut rig = rules(calm());
    let mut nvs = MockNvs::new();
    nvs.fail = true;
    rig.node
        .handle_command(AppCommand::SaveConfig, 0, &mut rig.hw, &mut rig.sink);
    assert!(!rig.node.auto_save_if_needed(10_000, &nvs));
    assert!(rig.node.is_config_dirty());

    nvs.fail = false;
    rig.node.force_save_if_dirty(&nvs);
    assert!(!rig.node.is_config_dirty());
    assert_eq!(nvs.saved.borrow().len(), 1);
}

#[test]
fn save_config_flushes_on_next_check() {
    let mut rig = rules(calm());
    let nvs = MockNvs::new();
    rig.run(0, 30_000, 50);
    assert!(!rig.node.is_config_dirty());

    rig.node
        .handle_command(AppCommand::SaveConfig, 30_000, &mut rig.hw, &mut rig.sink);
    assert!(rig.node.auto_save_if_needed(30_050, &nvs));
    assert!(!rig.node.is_config_dirty());
    assert_eq!(nvs.saved.borrow().len(), 1);
}

#[test]
fn invalid_config_update_keeps_live_config() {
    let mut rig = rules(calm());
    let nvs = MockNvs::new();
    let mut cfg = SystemConfig::default();
    cfg.alert_threshold = f32::NAN;
    cfg.sync_interval_ms = 60_000;

    rig.node
        .handle_command(AppCommand::UpdateConfig(cfg), 0, &mut rig.hw, &mut rig.sink);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ConfigRejected { at_ms: 0, .. })),
        1
    );
    assert_eq!(rig.node.current_config(), SystemConfig::default());
    assert!(!rig.node.is_config_dirty());

    rig.run(0, 10_000, 50);
    let a = rig.node.current_assessment().unwrap();
    assert_eq!(a.category, RiskCategory::Normal);
    assert!(rig.alerts().is_empty());
    assert!(!rig.node.is_escalated());
    assert!(!rig.node.auto_save_if_needed(10_000, &nvs));
    assert!(nvs.saved.borrow().is_empty());
}

#[test]
fn clear_diagnostics_zeroes_counters() {
    let mut rig = rules(calm());
    rig.run(0, 30_000, 5_000);
    assert!(rig.node.metrics().senses > 0);
    rig.node
        .handle_command(AppCommand::ClearDiagnostics, 30_000, &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.node.metrics().senses, 0);
    assert_eq!(rig.node.metrics().ticks, 0);
}
