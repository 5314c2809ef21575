use std::time::{Duration, Instant};

use crate::surface::TimerView;

pub const DEFAULT_TIMER_SECS: f64 = 300.0;
pub const MAX_TIMER_SECS: f64 = 24.0 * 60.0 * 60.0;
/// Redraw interval while a countdown is on screen.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
pub const DEFAULT_TIMER_EMOJI: &str = "⭐";
pub const ANIMATION_COUNT: usize = 6;
pub const IDLE_COUNTDOWN: &str = "00:00";

struct Running {
    end: Instant,
    label: String,
}

pub enum TimerTick {
    Idle,
    Remaining(String),
    /// Reached zero; the overlay is idle again.
    Finished { label: String },
}

/// Countdown overlay.  Remaining time is always recomputed from the end
/// instant, never decremented.
pub struct TimerOverlay {
    running: Option<Running>,
    emoji: String,
    animation: usize,
}

impl Default for TimerOverlay {
    fn default() -> Self {
        Self {
            running: None,
            emoji: DEFAULT_TIMER_EMOJI.to_string(),
            animation: 0,
        }
    }
}

impl TimerOverlay {
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn label(&self) -> Option<&str> {
        self.running.as_ref().map(|r| r.label.as_str())
    }

    /// Starts a countdown, replacing any running one.  Invalid durations
    /// fall back to five minutes and a blank label to "Timer".
    pub fn start(&mut self, seconds: Option<f64>, label: Option<&str>, now: Instant) -> TimerView {
        let seconds = sanitize_seconds(seconds);
        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or("Timer")
            .to_string();
        self.running = Some(Running {
            end: now + Duration::from_secs_f64(seconds),
            label: label.clone(),
        });
        TimerView {
            label,
            emoji: self.emoji.clone(),
            original: format_original_time(seconds),
            animation: self.animation,
        }
    }

    pub fn countdown(&self, now: Instant) -> String {
        match &self.running {
            Some(running) => format_countdown(running.end.saturating_duration_since(now)),
            None => IDLE_COUNTDOWN.to_string(),
        }
    }

    pub fn tick(&mut self, now: Instant) -> TimerTick {
        let Some(running) = &self.running else {
            return TimerTick::Idle;
        };
        if running.end <= now {
            let label = running.label.clone();
            self.running = None;
            TimerTick::Finished { label }
        } else {
            TimerTick::Remaining(self.countdown(now))
        }
    }

    /// Returns whether a countdown was running.  Safe to call when idle.
    pub fn cancel(&mut self) -> bool {
        self.running.take().is_some()
    }

    /// Picks a spinner emoji and moves on to the next animation.
    pub fn select_emoji(&mut self, emoji: &str) -> (String, usize) {
        self.emoji = if emoji.is_empty() {
            DEFAULT_TIMER_EMOJI.to_string()
        } else {
            emoji.to_string()
        };
        self.animation = (self.animation + 1) % ANIMATION_COUNT;
        (self.emoji.clone(), self.animation)
    }
}

pub fn sanitize_seconds(seconds: Option<f64>) -> f64 {
    seconds
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(DEFAULT_TIMER_SECS)
        .min(MAX_TIMER_SECS)
}

/// `MM:SS`, rounding partial seconds up.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_millis().div_ceil(1000);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// The requested length as `m:ss`.
pub fn format_original_time(seconds: f64) -> String {
    let total = seconds.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// "X min Y sec", leaving out zero parts.
pub fn format_timer_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).round().max(0.0) as u64;
    match (minutes, secs) {
        (0, 0) => "0 sec".to_string(),
        (0, s) => format!("{} sec", s),
        (m, 0) => format!("{} min", m),
        (m, s) => format!("{} min {} sec", m, s),
    }
}

/// Label for a magic-tab timer: minutes with one decimal from a minute up,
/// plain seconds below.
pub fn magic_timer_label(seconds: f64) -> Result<String, &'static str> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err("Pick a timer length to get started.");
    }
    let minutes = seconds / 60.0;
    if minutes >= 1.0 {
        Ok(format!("{} minute timer", (minutes * 10.0).round() / 10.0))
    } else {
        Ok(format!("{} second timer", seconds))
    }
}
