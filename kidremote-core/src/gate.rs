//! Press-and-hold plus PIN lock in front of the advanced settings.

use std::time::{Duration, Instant};

pub const HOLD_DURATION: Duration = Duration::from_millis(2000);
pub const HOLD_TICK: Duration = Duration::from_millis(50);
pub const PIN_ERROR_CLEAR: Duration = Duration::from_millis(1000);
/// Length of the hold ring's stroke.
pub const PROGRESS_CIRCUMFERENCE: f64 = 163.0;
pub const DEFAULT_PIN: &str = "1234";
pub const PIN_LENGTH: usize = 4;

const HOLD_HINT: &str = "Hold the gear button for two seconds to unlock advanced controls.";

#[derive(Clone, Debug, PartialEq)]
pub enum GateState {
    Locked,
    Holding { started: Instant, progress: f64 },
    PinEntry { digits: String, rejected: bool },
    Unlocked,
}

/// What the surface should reflect after a gate transition.
#[derive(Clone, Debug, PartialEq)]
pub enum GateEvent {
    HoldProgress { offset: f64 },
    PinPad { open: bool },
    PinDisplay { text: String, error: bool },
    /// Wrong PIN; the controller clears it after `PIN_ERROR_CLEAR`.
    PinRejected,
    Unlocked,
    Locked,
    Hint(&'static str),
}

pub struct SettingsGate {
    state: GateState,
}

impl Default for SettingsGate {
    fn default() -> Self {
        Self {
            state: GateState::Locked,
        }
    }
}

impl SettingsGate {
    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    pub fn is_holding(&self) -> bool {
        matches!(self.state, GateState::Holding { .. })
    }

    pub fn press(&mut self, now: Instant) -> Vec<GateEvent> {
        match self.state {
            GateState::Locked => {
                self.state = GateState::Holding {
                    started: now,
                    progress: 0.0,
                };
                vec![GateEvent::HoldProgress {
                    offset: PROGRESS_CIRCUMFERENCE,
                }]
            }
            GateState::Unlocked => self.lock(),
            GateState::Holding { .. } | GateState::PinEntry { .. } => Vec::new(),
        }
    }

    /// Samples the hold progress.  Reaching the full duration opens the
    /// PIN pad.
    pub fn tick(&mut self, now: Instant) -> Vec<GateEvent> {
        let GateState::Holding { started, .. } = self.state else {
            return Vec::new();
        };
        let elapsed = now.saturating_duration_since(started);
        let progress = (elapsed.as_secs_f64() / HOLD_DURATION.as_secs_f64()).min(1.0);
        let offset = PROGRESS_CIRCUMFERENCE - progress * PROGRESS_CIRCUMFERENCE;
        if progress >= 1.0 {
            self.state = GateState::PinEntry {
                digits: String::new(),
                rejected: false,
            };
            vec![
                GateEvent::HoldProgress {
                    offset: PROGRESS_CIRCUMFERENCE,
                },
                GateEvent::PinPad { open: true },
                GateEvent::PinDisplay {
                    text: pin_display(""),
                    error: false,
                },
            ]
        } else {
            self.state = GateState::Holding { started, progress };
            vec![GateEvent::HoldProgress { offset }]
        }
    }

    pub fn release(&mut self) -> Vec<GateEvent> {
        if !self.is_holding() {
            return Vec::new();
        }
        self.state = GateState::Locked;
        vec![GateEvent::HoldProgress {
            offset: PROGRESS_CIRCUMFERENCE,
        }]
    }

    /// A plain click on the gear.  Locks when unlocked, otherwise explains
    /// how to unlock.
    pub fn gear_click(&mut self) -> Vec<GateEvent> {
        match self.state {
            GateState::Unlocked => self.lock(),
            GateState::Locked => vec![GateEvent::Hint(HOLD_HINT)],
            _ => Vec::new(),
        }
    }

    pub fn enter_digit(&mut self, digit: char, active_pin: &str) -> Vec<GateEvent> {
        let GateState::PinEntry { digits, rejected } = &mut self.state else {
            return Vec::new();
        };
        if *rejected || !digit.is_ascii_digit() || digits.len() >= PIN_LENGTH {
            return Vec::new();
        }
        digits.push(digit);
        let mut events = vec![GateEvent::PinDisplay {
            text: pin_display(digits),
            error: false,
        }];
        if digits.len() < PIN_LENGTH {
            return events;
        }
        if digits.as_str() == active_pin {
            self.state = GateState::Unlocked;
            events.push(GateEvent::PinPad { open: false });
            events.push(GateEvent::Unlocked);
        } else {
            *rejected = true;
            events.push(GateEvent::PinDisplay {
                text: "✖ Wrong PIN".to_string(),
                error: true,
            });
            events.push(GateEvent::PinRejected);
        }
        events
    }

    /// Clears a rejected entry so the next attempt can start.
    pub fn clear_pin(&mut self) -> Vec<GateEvent> {
        let GateState::PinEntry { digits, rejected } = &mut self.state else {
            return Vec::new();
        };
        digits.clear();
        *rejected = false;
        vec![GateEvent::PinDisplay {
            text: pin_display(""),
            error: false,
        }]
    }

    pub fn cancel_pin(&mut self) -> Vec<GateEvent> {
        if !matches!(self.state, GateState::PinEntry { .. }) {
            return Vec::new();
        }
        self.state = GateState::Locked;
        vec![GateEvent::PinPad { open: false }]
    }

    fn lock(&mut self) -> Vec<GateEvent> {
        self.state = GateState::Locked;
        vec![GateEvent::Locked]
    }
}

/// Filled and empty dots for the digits typed so far.
pub fn pin_display(digits: &str) -> String {
    let filled = digits.chars().count().min(PIN_LENGTH);
    "●".repeat(filled) + &"○".repeat(PIN_LENGTH - filled)
}

pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Keeps the digits of `value`.  Yields a PIN only if there are at least
/// four, and uses the first four.
pub fn sanitize_pin(value: &str) -> Option<String> {
    let digits: String = value
        .chars()
        .filter(char::is_ascii_digit)
        .take(PIN_LENGTH)
        .collect();
    Some(digits).filter(|d| d.len() == PIN_LENGTH)
}

/// Local override, then the PIN from the loaded document, then the default.
pub fn active_pin<'a>(local: Option<&'a str>, remote: Option<&'a str>) -> &'a str {
    local
        .filter(|pin| is_valid_pin(pin))
        .or(remote)
        .unwrap_or(DEFAULT_PIN)
}

pub fn pin_status_text(local: Option<&str>, remote: Option<&str>) -> String {
    match (local.filter(|pin| is_valid_pin(pin)), remote) {
        (Some(pin), _) => format!(
            "Using device-specific PIN ({}) on this device.",
            "•".repeat(pin.len())
        ),
        (None, Some(remote)) if remote != DEFAULT_PIN => "Using PIN from cloud config.".to_string(),
        _ => format!("Using default PIN ({}).", DEFAULT_PIN),
    }
}
