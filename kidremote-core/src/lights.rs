//! Govee light control over the LAN API, plus the routine runner.

use std::{thread, time::Duration};

use serde::Deserialize;
use serde_json::Value;

use kidremote_protocol::govee::{Message, Rgb, LAN_CONTROL_PORT};

use crate::{
    bridge::{Bridge, GoveeStatus},
    error::Error,
    storage::{keys, Storage},
};

pub const DEFAULT_BRIGHTNESS: u8 = 50;
/// Longest pause a routine step may ask for.
pub const MAX_STEP_DELAY: Duration = Duration::from_secs(60);

pub const PRESETS: &[(&str, &str)] = &[
    ("warm", "#ffe3c4"),
    ("blue", "#7ac3ff"),
    ("sunset", "#ff8c5a"),
    ("white", "#ffffff"),
];

const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanTarget {
    pub host: String,
    pub port: u16,
}

impl LanTarget {
    pub fn from_storage(storage: &Storage) -> Result<Self, Error> {
        let host = storage
            .get(keys::GOVEE_IP)
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .ok_or_else(|| Error::InvalidInput("Add the light IP first.".into()))?;
        let port = storage
            .get(keys::GOVEE_PORT)
            .and_then(|port| port.trim().parse().ok())
            .filter(|port| *port != 0)
            .unwrap_or(LAN_CONTROL_PORT);
        Ok(Self { host, port })
    }

    pub fn send(&self, bridge: &dyn Bridge, message: Message) -> Result<(), Error> {
        let cmd = message.cmd.clone();
        bridge.govee_send(&self.host, Some(self.port), &message.into_envelope())?;
        log::info!("sent {} to {}:{}", cmd, self.host, self.port);
        Ok(())
    }
}

pub fn stored_brightness(storage: &Storage) -> u8 {
    storage
        .get(keys::GOVEE_BRIGHTNESS)
        .and_then(|value| value.trim().parse::<u8>().ok())
        .filter(|value| (1..=100).contains(value))
        .unwrap_or(DEFAULT_BRIGHTNESS)
}

/// Parses `#rrggbb` (the `#` is optional).
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Unknown presets are white.
pub fn preset_color(name: &str) -> Rgb {
    PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
        .and_then(|(_, hex)| hex_to_rgb(hex))
        .unwrap_or(WHITE)
}

/// One line describing a status reply, `-` for anything unknown.
pub fn status_text(status: &GoveeStatus) -> String {
    let power = match status.power {
        Some(true) => "on",
        Some(false) => "off",
        None => "-",
    };
    let brightness = status
        .brightness
        .filter(|b| *b > 0)
        .map_or_else(|| "-".to_string(), |b| format!("{}%", b));
    let color = status.color.map_or_else(
        || "-".to_string(),
        |c| format!("rgb({}, {}, {})", c.r, c.g, c.b),
    );
    format!(
        "online: {}, power: {}, brightness: {}, color: {}",
        if status.online { "yes" } else { "no" },
        power,
        brightness,
        color
    )
}

/// One step of a light routine.  Numbers are taken as written and clamped
/// when the step runs, so `150` or `-1` do not reject the whole step.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineStep {
    pub power: Option<bool>,
    pub brightness: Option<f64>,
    pub color: Option<String>,
    pub preset: Option<String>,
    pub delay_ms: Option<f64>,
}

impl RoutineStep {
    /// Power first, then brightness, then color.  An explicit color wins
    /// over a preset; an unparsable color falls back to the preset.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        if let Some(on) = self.power {
            messages.push(Message::turn(on));
        }
        if let Some(brightness) = self.brightness_level() {
            messages.push(Message::brightness(brightness));
        }
        let color = self
            .color
            .as_deref()
            .and_then(hex_to_rgb)
            .or_else(|| self.preset.as_deref().map(preset_color));
        if let Some(rgb) = color {
            messages.push(Message::color(rgb));
        }
        messages
    }

    /// Brightness rounded into `0..=100`.
    pub fn brightness_level(&self) -> Option<u8> {
        self.brightness
            .filter(|level| level.is_finite())
            .map(|level| level.round().clamp(0.0, 100.0) as u8)
    }

    /// Pause after the step.  Negative delays are no delay.
    pub fn delay(&self) -> Duration {
        match self.delay_ms {
            Some(ms) if ms.is_finite() && ms > 0.0 => {
                Duration::from_millis(ms.round() as u64).min(MAX_STEP_DELAY)
            }
            _ => Duration::ZERO,
        }
    }
}

/// Reads routine steps from handler arguments.  Accepts the steps as one
/// array argument or spread over the arguments; entries that are not step
/// objects are skipped.
pub fn parse_routine(args: &[Value]) -> Vec<RoutineStep> {
    let entries: Vec<&Value> = match args {
        [Value::Array(steps)] => steps.iter().collect(),
        _ => args.iter().collect(),
    };
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(step) => Some(step),
            Err(err) => {
                log::warn!("skipping routine step {}: {}", entry, err);
                None
            }
        })
        .collect()
}

/// Runs `steps` in order, sleeping after each one.  Blocks, so call it
/// from a worker.  Returns the number of commands sent.
pub fn run_routine(
    bridge: &dyn Bridge,
    target: &LanTarget,
    steps: &[RoutineStep],
) -> Result<usize, Error> {
    let mut sent = 0;
    for (index, step) in steps.iter().enumerate() {
        for message in step.messages() {
            target.send(bridge, message)?;
            sent += 1;
        }
        let delay = step.delay();
        if !delay.is_zero() && index + 1 < steps.len() {
            thread::sleep(delay);
        }
    }
    Ok(sent)
}

/// The cloud light the cloud controls act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloudTarget {
    pub device: String,
    pub model: String,
}

impl CloudTarget {
    /// Both parts trimmed and non-empty.
    pub fn new(device: &str, model: &str) -> Option<Self> {
        let (device, model) = (device.trim(), model.trim());
        (!device.is_empty() && !model.is_empty()).then(|| Self {
            device: device.to_string(),
            model: model.to_string(),
        })
    }

    /// Target for an entry of the cloud device list.
    pub fn from_device(device: &Value) -> Option<Self> {
        let device_id = device.get("device").and_then(Value::as_str)?;
        let model = device.get("model").and_then(Value::as_str)?;
        Self::new(device_id, model)
    }
}

/// Power state reported by the cloud state endpoint, either at the top
/// level or in the `data.properties` list.
pub fn cloud_power_state(state: &Value) -> Option<bool> {
    let from_value = |value: &Value| match value {
        Value::String(text) => Some(text == "on"),
        Value::Bool(on) => Some(*on),
        _ => None,
    };
    if let Some(power) = state.get("powerState").and_then(from_value) {
        return Some(power);
    }
    state
        .pointer("/data/properties")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|property| property.get("powerState").and_then(from_value))
}

/// Device list from the cloud API, either a bare array or wrapped in
/// `data.devices`.
pub fn normalize_cloud_devices(raw: &Value) -> Vec<Value> {
    match raw {
        Value::Array(devices) => devices.clone(),
        _ => raw
            .pointer("/data/devices")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}
