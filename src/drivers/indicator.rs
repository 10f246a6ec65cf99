//! Indicator pattern engine with priority-based pattern selection.
//!
//! Turns node state into a time-varying RGB value plus a buzzer line.
//! The hardware adapter calls `tick()` once per loop iteration and
//! forwards the output to the LED / buzzer pins.
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Halted**: rapid red flash, buzzer off (nothing left to warn about)
//! 2. **Escalation**: fast amber-red blink with the buzzer sounding
//! 3. **Degraded**: yellow double blink
//! 4. **Power mode**: steady or breathing mode colour
//!
//! | Pattern      | Description                      | Rate   |
//! |--------------|----------------------------------|--------|
//! | Solid        | Constant colour                  | -      |
//! | Breathing    | Triangular fade up/down          | 0.5 Hz |
//! | DoubleBlink  | Two quick flashes, then pause    | 1 Hz   |
//! | FastBlink    | On/off square wave               | 4 Hz   |
//! | RapidFlash   | Very fast on/off                 | 8 Hz   |

use crate::app::service::NodeHealth;
use crate::power::PowerMode;

/// Colour as (R, G, B), each 0–255.
pub type Rgb = (u8, u8, u8);

pub const OFF: Rgb = (0, 0, 0);
pub const COLOUR_HALTED: Rgb = (255, 0, 0);
pub const COLOUR_ESCALATION: Rgb = (255, 64, 0);
pub const COLOUR_DEGRADED: Rgb = (255, 200, 0);
pub const COLOUR_EMERGENCY: Rgb = (128, 0, 0);
pub const COLOUR_POWER_SAVE: Rgb = (0, 60, 160);
pub const COLOUR_NORMAL: Rgb = (0, 180, 60);
pub const COLOUR_HIGH_PERFORMANCE: Rgb = (0, 255, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Solid,
    Breathing,
    DoubleBlink,
    FastBlink,
    RapidFlash,
}

/// What the indicator pins should show right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorOutput {
    pub rgb: Rgb,
    pub buzzer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layer {
    colour: Rgb,
    pattern: Pattern,
    buzzer: bool,
}

/// Indicator engine.  Stack-allocated, no heap.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    phase_ms: u32,
    active: Option<Layer>,
    halted: bool,
    escalated: bool,
    degraded: bool,
    mode: Option<PowerMode>,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self {
            phase_ms: 0,
            active: None,
            halted: false,
            escalated: false,
            degraded: false,
            mode: None,
        }
    }

    pub fn set_escalation(&mut self, engaged: bool) {
        self.escalated = engaged;
    }

    pub fn set_health(&mut self, health: NodeHealth) {
        self.halted = matches!(health, NodeHealth::Halted(_));
        self.degraded = matches!(health, NodeHealth::Degraded(_));
    }

    pub fn set_power_mode(&mut self, mode: PowerMode) {
        self.mode = Some(mode);
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated
    }

    /// Advance the phase by `delta_ms` and return the current output.
    pub fn tick(&mut self, delta_ms: u32) -> IndicatorOutput {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);

        let selected = self.select();
        if selected.map(|l| l.pattern) != self.active.map(|l| l.pattern) {
            self.phase_ms = 0;
        }
        self.active = selected;

        match self.active {
            Some(layer) => IndicatorOutput {
                rgb: self.generate(layer.colour, layer.pattern),
                buzzer: layer.buzzer,
            },
            None => IndicatorOutput {
                rgb: OFF,
                buzzer: false,
            },
        }
    }

    fn select(&self) -> Option<Layer> {
        if self.halted {
            return Some(Layer {
                colour: COLOUR_HALTED,
                pattern: Pattern::RapidFlash,
                buzzer: false,
            });
        }
        if self.escalated {
            return Some(Layer {
                colour: COLOUR_ESCALATION,
                pattern: Pattern::FastBlink,
                buzzer: true,
            });
        }
        if self.degraded {
            return Some(Layer {
                colour: COLOUR_DEGRADED,
                pattern: Pattern::DoubleBlink,
                buzzer: false,
            });
        }
        self.mode.map(|mode| {
            let (colour, pattern) = match mode {
                PowerMode::Emergency => (COLOUR_EMERGENCY, Pattern::Breathing),
                PowerMode::PowerSave => (COLOUR_POWER_SAVE, Pattern::Breathing),
                PowerMode::Normal => (COLOUR_NORMAL, Pattern::Solid),
                PowerMode::HighPerformance => (COLOUR_HIGH_PERFORMANCE, Pattern::Solid),
            };
            Layer {
                colour,
                pattern,
                buzzer: false,
            }
        })
    }

    fn generate(&self, colour: Rgb, pattern: Pattern) -> Rgb {
        let on = match pattern {
            Pattern::Solid => true,
            Pattern::Breathing => {
                return scale(colour, triangle(self.phase_ms, 2000));
            }
            Pattern::DoubleBlink => {
                let cycle = self.phase_ms % 1000;
                cycle < 100 || (200..300).contains(&cycle)
            }
            Pattern::FastBlink => (self.phase_ms % 250) < 125,
            Pattern::RapidFlash => (self.phase_ms % 125) < 63,
        };
        if on { colour } else { OFF }
    }
}

/// Triangular 0→255→0 ramp over `period_ms`.
fn triangle(phase_ms: u32, period_ms: u32) -> u8 {
    let pos = u64::from(phase_ms % period_ms);
    let half = u64::from(period_ms) / 2;
    if pos < half {
        ((pos * 255) / half) as u8
    } else {
        (((u64::from(period_ms) - pos) * 255) / half) as u8
    }
}

fn scale((r, g, b): Rgb, brightness: u8) -> Rgb {
    let br = u16::from(brightness);
    (
        ((u16::from(r) * br) / 255) as u8,
        ((u16::from(g) * br) / 255) as u8,
        ((u16::from(b) * br) / 255) as u8,
    )
}
