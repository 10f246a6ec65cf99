//! End-to-end runs with the concrete host adapters wired in, the way the
//! binary wires them.

use envnode::adapters::broadcast::PeerBroadcast;
use envnode::adapters::hardware::SimulatedHardware;
use envnode::adapters::log_sink::LogEventSink;
use envnode::adapters::model::LogisticModel;
use envnode::adapters::nvs::NvsAdapter;
use envnode::app::ports::ConfigPort;
use envnode::app::service::NodeService;
use envnode::config::SystemConfig;
use envnode::error::InferenceError;
use envnode::inference::RiskClassifier;
use envnode::reading::Reading;

fn learned() -> LogisticModel {
    LogisticModel {
        mean: [20.0, 50.0, 100.0, 600.0, 40_000.0, 40.0],
        scale: [10.0, 20.0, 100.0, 400.0, 10_000.0, 10.0],
        weights: [0.2, 0.2, 1.0, 1.5, 0.0, 0.0],
        bias: -2.0,
    }
}

#[test]
fn simulated_hour_on_rules() {
    let mut hw = SimulatedHardware::new();
    let mut link = PeerBroadcast::new();
    link.connect(1);
    let mut sink = LogEventSink::new();

    let mut node: NodeService = NodeService::new(SystemConfig::default(), RiskClassifier::RuleBased, 0);
    node.start(0, &mut hw, &mut sink);

    let mut frames = 0;
    for now in (0..=3_600_000u64).step_by(50) {
        node.tick(now, &mut hw, &mut link, &mut sink);
        while let Some(frame) = link.next_frame() {
            assert_eq!(frame.peer, 1);
            let json: serde_json::Value = serde_json::from_slice(&frame.payload).unwrap();
            assert_eq!(json["strategy"], "rule-based");
            frames += 1;
        }
    }

    // 3600 s / 30 s sync cadence.
    assert_eq!(frames, 120);
    let m = node.metrics();
    assert_eq!(m.sync_failures, 0);
    assert_eq!(m.rejected_readings, 0);
    assert_eq!(m.sensor_failures, 0);
    assert!(node.current_assessment().is_some());
}

#[test]
fn learned_model_from_nvs_drives_the_classifier() {
    let mut nvs = NvsAdapter::new().unwrap();
    learned().store(&mut nvs).unwrap();
    let model = LogisticModel::load(&nvs).unwrap();

    let mut hw = SimulatedHardware::new();
    hw.script(Ok(Reading {
        co2_ppm: 3_000.0,
        voc_index: 450.0,
        temperature_c: 22.0,
        humidity_pct: 45.0,
        battery_v: 4.0,
        ..Reading::default()
    }));
    hw.script(Ok(Reading {
        co2_ppm: 3_000.0,
        voc_index: 450.0,
        temperature_c: 22.0,
        humidity_pct: 45.0,
        battery_v: 4.0,
        ..Reading::default()
    }));
    let mut link = PeerBroadcast::new();
    let mut sink = LogEventSink::new();
    let mut node = NodeService::new(SystemConfig::default(), RiskClassifier::Learned(model), 0);
    node.start(0, &mut hw, &mut sink);

    node.tick(5_000, &mut hw, &mut link, &mut sink);
    node.tick(10_000, &mut hw, &mut link, &mut sink);

    assert_eq!(node.strategy_name(), "learned-model");
    let a = node.current_assessment().unwrap();
    assert!(a.environmental_risk > 0.8, "risk {}", a.environmental_risk);
    assert_eq!(node.metrics().alerts_fired, 1);
    assert!(hw.is_escalated());
    assert!(hw.refresh(10_000).buzzer);
}

#[test]
fn missing_model_is_reported_for_fallback() {
    let nvs = NvsAdapter::new().unwrap();
    assert_eq!(LogisticModel::load(&nvs), Err(InferenceError::ModelMissing));
}

#[test]
fn config_persists_across_adapter_use() {
    let nvs = NvsAdapter::new().unwrap();
    let mut node: NodeService = NodeService::new(nvs.load().unwrap(), RiskClassifier::RuleBased, 0);
    let mut hw = SimulatedHardware::new();
    let mut sink = LogEventSink::new();

    let mut cfg = node.current_config();
    cfg.sync_interval_ms = 60_000;
    node.handle_command(
        envnode::app::commands::AppCommand::UpdateConfig(cfg.clone()),
        0,
        &mut hw,
        &mut sink,
    );
    node.force_save_if_dirty(&nvs);
    assert_eq!(nvs.load().unwrap(), cfg);
}
