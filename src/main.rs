//! EnvNode Firmware: Main Entry Point
//!
//! Hexagonal architecture around a cooperative, energy-aware scheduler.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedHardware  LogEventSink  NvsAdapter   MonotonicClock  │
//! │  (Sensor+Indicator) (EventSink)   (Config+NVS) (DelayNs)       │
//! │  PeerBroadcast      LogisticModel                              │
//! │  (Broadcast)        (Model)                                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              NodeService (pure logic)                  │    │
//! │  │  Scheduler · Validator · Classifier · Alerts · Power   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use log::{debug, error, info, trace, warn};

use envnode::adapters::broadcast::PeerBroadcast;
use envnode::adapters::hardware::SimulatedHardware;
use envnode::adapters::log_sink::LogEventSink;
use envnode::adapters::model::LogisticModel;
use envnode::adapters::nvs::NvsAdapter;
use envnode::adapters::time::MonotonicClock;
use envnode::app::ports::ConfigPort;
use envnode::app::service::{InitReport, NodeService};
use envnode::config::{ClassifierStrategy, SystemConfig};
use envnode::inference::RiskClassifier;

fn init_logging() -> Result<()> {
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    #[cfg(not(target_os = "espidf"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    Ok(())
}

/// Bring up the configured classifier.  A learned model that fails to load
/// falls back to rules and is noted in the report.
fn select_classifier(
    config: &SystemConfig,
    nvs: &NvsAdapter,
    report: &mut InitReport,
) -> RiskClassifier<LogisticModel> {
    match config.classifier {
        ClassifierStrategy::RuleBased => RiskClassifier::RuleBased,
        ClassifierStrategy::LearnedModel => match LogisticModel::load(nvs) {
            Ok(model) => RiskClassifier::Learned(model),
            Err(e) => {
                warn!("Learned model unavailable ({}), falling back to rules", e);
                report.degrade("learned model unavailable");
                RiskClassifier::RuleBased
            }
        },
    }
}

fn main() -> Result<()> {
    // ── 1. Bootstrap ──────────────────────────────────────────
    init_logging()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  EnvNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let mut clock = MonotonicClock::new();

    let mut report = InitReport::new();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(nvs) => nvs,
        Err(e) => {
            error!("NVS init failed: {}", e);
            report.degrade("storage unavailable");
            NvsAdapter::unavailable()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            report.degrade("stored config rejected");
            SystemConfig::default()
        }
    };

    // ── 3. Construct adapters ─────────────────────────────────
    let mut hw = SimulatedHardware::new();
    #[cfg(not(target_os = "espidf"))]
    if let Some(scale) = std::env::var("ENVNODE_SIM_SCALE")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
    {
        info!("Simulation running {}x real time", scale);
        hw = hw.with_time_scale(scale);
    }
    let mut sink = LogEventSink::new();
    let mut link = PeerBroadcast::new();
    link.connect(0);

    // ── 4. Construct the node service ─────────────────────────
    let classifier = select_classifier(&config, &nvs, &mut report);
    if let Err(e) = hw.probe() {
        error!("Sensor bring-up failed: {}", e);
        report.fail("sensor front-end not responding");
    }

    let mut node = NodeService::new(config, classifier, clock.now_ms());
    node.start(clock.now_ms(), &mut hw, &mut sink);
    node.apply_init_report(&report, clock.now_ms(), &mut hw, &mut sink);

    info!("System ready. Entering scheduler loop.");

    // ── 5. Scheduler loop ─────────────────────────────────────
    loop {
        let now = clock.now_ms();
        let ran = node.tick(now, &mut hw, &mut link, &mut sink);
        let took = clock.now_ms().saturating_sub(now);
        let overrun_ms = node.overrun_budget_ms();
        if !ran.is_empty() {
            trace!("Tick @{}ms ran {:?} in {}ms", now, ran, took);
        }
        if took > overrun_ms {
            warn!("Tick overran: {}ms > {}ms", took, overrun_ms);
            node.record_overrun();
        }

        while let Some(frame) = link.next_frame() {
            debug!(
                "TX peer={} seq={} {}",
                frame.peer,
                frame.seq,
                String::from_utf8_lossy(&frame.payload)
            );
        }

        hw.refresh(clock.now_ms());
        node.auto_save_if_needed(now, &nvs);
        clock.delay_ms(node.idle_slice_ms());
    }
}
