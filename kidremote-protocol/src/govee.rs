//! Govee LAN API messages.
//!
//! Lights listen for JSON datagrams on `LAN_CONTROL_PORT` and answer on
//! `LAN_LISTEN_PORT`.  Discovery is a `scan` request sent to the multicast
//! group on `LAN_SCAN_PORT`.  Every datagram is wrapped as `{"msg": {...}}`.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const LAN_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const LAN_SCAN_PORT: u16 = 4001;
pub const LAN_LISTEN_PORT: u16 = 4002;
pub const LAN_CONTROL_PORT: u16 = 4003;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub msg: Message,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub cmd: String,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    pub fn new(cmd: impl Into<String>, data: Value) -> Self {
        Self {
            cmd: cmd.into(),
            data,
        }
    }

    pub fn scan() -> Self {
        Self::new("scan", json!({ "account_topic": "reserve" }))
    }

    pub fn dev_status() -> Self {
        Self::new("devStatus", json!({}))
    }

    pub fn turn(on: bool) -> Self {
        Self::new("turn", json!({ "value": u8::from(on) }))
    }

    pub fn brightness(value: u8) -> Self {
        Self::new("brightness", json!({ "value": value.min(100) }))
    }

    pub fn color(rgb: Rgb) -> Self {
        Self::new(
            "colorwc",
            json!({ "color": rgb, "colorTemInKelvin": 0 }),
        )
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope { msg: self }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Payload of a `scan` reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReply {
    pub ip: String,
    pub device: String,
    pub sku: String,
    #[serde(default)]
    pub ble_version_hard: Option<String>,
    #[serde(default)]
    pub ble_version_soft: Option<String>,
    #[serde(default)]
    pub wifi_version_hard: Option<String>,
    #[serde(default)]
    pub wifi_version_soft: Option<String>,
}

/// Payload of a `devStatus` reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevStatusReply {
    pub on_off: u8,
    pub brightness: u8,
    #[serde(default)]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub color_tem_in_kelvin: Option<u32>,
}

pub fn parse_reply(datagram: &[u8]) -> Result<Message, serde_json::Error> {
    serde_json::from_slice::<Envelope>(datagram).map(|envelope| envelope.msg)
}

impl Message {
    pub fn scan_reply(&self) -> Option<ScanReply> {
        if self.cmd != "scan" {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }

    pub fn dev_status_reply(&self) -> Option<DevStatusReply> {
        if self.cmd != "devStatus" {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Body of a `PUT /devices/control` request on the developer cloud API.
#[derive(Clone, Debug, Serialize)]
pub struct CloudControl<'a> {
    pub device: &'a str,
    pub model: &'a str,
    pub cmd: &'a Value,
}

/// The `cmd` object of a cloud control request.
#[derive(Clone, Debug, PartialEq)]
pub struct CloudCommand {
    pub name: &'static str,
    pub value: Value,
}

impl CloudCommand {
    pub fn turn(on: bool) -> Self {
        Self {
            name: "turn",
            value: json!(if on { "on" } else { "off" }),
        }
    }

    pub fn brightness(value: u8) -> Self {
        Self {
            name: "brightness",
            value: json!(value.min(100)),
        }
    }

    pub fn color(rgb: Rgb) -> Self {
        Self {
            name: "color",
            value: json!({ "r": rgb.r, "g": rgb.g, "b": rgb.b }),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "name": self.name, "value": self.value })
    }
}
