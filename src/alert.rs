//! Alert gate.
//!
//! Watches classifier output and decides when an emergency alert goes out.
//! An alert fires when the risk score is strictly above the threshold and
//! at least one cooldown period has passed since the previous alert.
//! Alerts that would have fired inside the cooldown are counted, not sent.
//!
//! The gate only decides.  Delivering the alert (event sink, listeners,
//! local escalation indicator) is the service's job.

use core::fmt::Write as _;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::inference::{RiskAssessment, RiskCategory};

/// Alert classification carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    EnvironmentalRisk,
}

/// A structured emergency alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: RiskCategory,
    pub risk: f32,
    /// Monotonic time the alert fired (ms since boot).
    pub timestamp_ms: u64,
    pub message: heapless::String<64>,
}

/// Threshold + cooldown gate.
#[derive(Debug, Clone)]
pub struct AlertGate {
    threshold: f32,
    /// Fixed spacing; `None` spaces alerts by the current infer interval.
    cooldown_ms: Option<u64>,
    last_fired_ms: Option<u64>,
    suppressed: u32,
}

impl AlertGate {
    pub fn new(threshold: f32, cooldown_ms: Option<u64>) -> Self {
        Self {
            threshold,
            cooldown_ms,
            last_fired_ms: None,
            suppressed: 0,
        }
    }

    /// Decide whether `assessment` raises an alert at `now_ms`.
    ///
    /// `infer_interval_ms` is the default cooldown when none is configured.
    pub fn evaluate(
        &mut self,
        assessment: &RiskAssessment,
        now_ms: u64,
        infer_interval_ms: u64,
    ) -> Option<Alert> {
        if assessment.environmental_risk <= self.threshold {
            return None;
        }

        let cooldown = self.cooldown_ms.unwrap_or(infer_interval_ms);
        if let Some(last) = self.last_fired_ms {
            let since = now_ms.saturating_sub(last);
            if since < cooldown {
                self.suppressed = self.suppressed.saturating_add(1);
                debug!(
                    "Alert suppressed (risk={:.2}, {}ms into {}ms cooldown)",
                    assessment.environmental_risk, since, cooldown
                );
                return None;
            }
        }

        self.last_fired_ms = Some(now_ms);

        let mut message = heapless::String::new();
        // Truncated on overflow.
        let _ = write!(
            message,
            "{} environmental risk {:.2}",
            assessment.category, assessment.environmental_risk
        );
        warn!("ALERT | {message} at {now_ms}ms");

        Some(Alert {
            kind: AlertKind::EnvironmentalRisk,
            severity: assessment.category,
            risk: assessment.environmental_risk,
            timestamp_ms: now_ms,
            message,
        })
    }

    /// Swap threshold and cooldown, keeping the firing history.
    pub fn set_policy(&mut self, threshold: f32, cooldown_ms: Option<u64>) {
        self.threshold = threshold;
        self.cooldown_ms = cooldown_ms;
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Alerts withheld by the cooldown since the last reset.
    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }

    pub fn last_fired_ms(&self) -> Option<u64> {
        self.last_fired_ms
    }

    pub fn reset(&mut self) {
        self.last_fired_ms = None;
        self.suppressed = 0;
    }
}
