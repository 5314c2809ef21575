use std::time::{Duration, Instant};

use rand::Rng;

pub const DEFAULT_FIREWORKS_DURATION: Duration = Duration::from_millis(6000);
pub const BURST_INTERVAL: Duration = Duration::from_millis(600);
const MAX_FIREWORKS_SECS: f64 = 600.0;
pub const DEFAULT_MESSAGE: &str = "Fireworks!";

/// Where a burst goes off, as fractions of the overlay size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Burst {
    pub x: f64,
    pub y: f64,
}

#[derive(Default)]
pub struct FireworksOverlay {
    ends_at: Option<Instant>,
}

impl FireworksOverlay {
    pub fn is_active(&self) -> bool {
        self.ends_at.is_some()
    }

    pub fn ends_at(&self) -> Option<Instant> {
        self.ends_at
    }

    /// Starts a show, replacing any running one, and returns the message
    /// to display.
    pub fn start(&mut self, seconds: Option<f64>, message: Option<&str>, now: Instant) -> String {
        let duration = seconds
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(|s| Duration::from_secs_f64(s.min(MAX_FIREWORKS_SECS)))
            .unwrap_or(DEFAULT_FIREWORKS_DURATION);
        self.ends_at = Some(now + duration);
        message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MESSAGE)
            .to_string()
    }

    /// Returns whether a show was running.
    pub fn stop(&mut self) -> bool {
        self.ends_at.take().is_some()
    }

    pub fn is_over(&self, now: Instant) -> bool {
        self.ends_at.is_some_and(|end| end <= now)
    }
}

/// Two or three bursts spread over the middle of the overlay.
pub fn bursts(rng: &mut impl Rng) -> Vec<Burst> {
    let count = rng.random_range(2..=3);
    (0..count)
        .map(|_| Burst {
            x: rng.random_range(0.2..0.8),
            y: rng.random_range(0.3..0.8),
        })
        .collect()
}
