//! Sample validator.
//!
//! Runs on every fresh [`Reading`] before it may reach the classifier.
//! Each bounded field is checked independently and the violations are
//! accumulated into a fault bitmask (see [`ValidationFault::mask`]).
//!
//! ## Policy
//!
//! - Bounds are inclusive: a temperature of exactly -40 °C or 85 °C is valid.
//! - There is no partial validity.  Any violated bound rejects the whole
//!   reading and the scheduler skips inference for that cycle.
//! - NaN never satisfies a bound, so a NaN field always rejects.

use log::debug;

use crate::config::ValidationBounds;
use crate::error::ValidationFault;
use crate::reading::Reading;

/// Range-check validator.
#[derive(Debug, Clone)]
pub struct SampleValidator {
    bounds: ValidationBounds,
}

impl Default for SampleValidator {
    fn default() -> Self {
        Self::new(ValidationBounds::default())
    }
}

impl SampleValidator {
    pub fn new(bounds: ValidationBounds) -> Self {
        Self { bounds }
    }

    /// `true` iff every bounded field is within its inclusive range.
    pub fn validate(&self, reading: &Reading) -> bool {
        self.faults(reading) == 0
    }

    /// Evaluate all bounds and return the violation bitmask (0 = valid).
    pub fn faults(&self, reading: &Reading) -> u8 {
        let b = &self.bounds;
        let mut faults = 0u8;

        Self::eval_fault(
            &mut faults,
            ValidationFault::TemperatureOutOfRange,
            !within(reading.temperature_c, b.temperature_c),
        );
        Self::eval_fault(
            &mut faults,
            ValidationFault::HumidityOutOfRange,
            !within(reading.humidity_pct, b.humidity_pct),
        );
        Self::eval_fault(
            &mut faults,
            ValidationFault::Co2OutOfRange,
            !within(reading.co2_ppm, b.co2_ppm),
        );
        Self::eval_fault(
            &mut faults,
            ValidationFault::VocOutOfRange,
            !within(reading.voc_index, b.voc_index),
        );

        faults
    }

    /// Validate and stamp `reading.valid`.  Returns the fault bitmask.
    pub fn stamp(&self, reading: &mut Reading) -> u8 {
        let faults = self.faults(reading);
        reading.valid = faults == 0;
        faults
    }

    fn eval_fault(faults: &mut u8, fault: ValidationFault, condition: bool) {
        if condition {
            debug!("validation: {fault}");
            *faults |= fault.mask();
        }
    }
}

/// Inclusive range check.
fn within(value: f32, (lo, hi): (f32, f32)) -> bool {
    (lo..=hi).contains(&value)
}
