use std::{
    collections::BTreeMap,
    net::{Ipv4Addr, UdpSocket},
    time::{Duration, Instant},
};

use serde_json::{Map, Value};

use kidremote_protocol::govee::{
    parse_reply, CloudControl, Envelope, Message, ScanReply, LAN_CONTROL_PORT, LAN_LISTEN_PORT,
    LAN_MULTICAST_ADDR, LAN_SCAN_PORT,
};

use crate::{error::Error, registry::Device, util::default_ureq_agent_builder};

use super::{network::is_timeout, GoveeStatus};

pub const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

pub fn send(host: &str, port: Option<u16>, body: &Envelope) -> Result<(), Error> {
    let payload = serde_json::to_vec(body)?;
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.send_to(&payload, (host, port.unwrap_or(LAN_CONTROL_PORT)))?;
    log::debug!("sent {} to {}", body.msg.cmd, host);
    Ok(())
}

/// Multicasts a scan and gathers replies on the listen port until `timeout`.
pub fn discover(timeout: Duration) -> Result<Vec<Device>, Error> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, LAN_LISTEN_PORT))?;
    if let Err(err) = socket.join_multicast_v4(&LAN_MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED) {
        log::warn!("failed to join govee multicast group: {}", err);
    }
    let scan = serde_json::to_vec(&Message::scan().into_envelope())?;
    socket.send_to(&scan, (LAN_MULTICAST_ADDR, LAN_SCAN_PORT))?;

    let mut found = BTreeMap::new();
    for datagram in receive_until(&socket, Instant::now() + timeout)? {
        let reply = parse_reply(&datagram).ok().and_then(|msg| msg.scan_reply());
        if let Some(device) = reply.map(device_from_scan) {
            found.entry(device.id.clone()).or_insert(device);
        }
    }
    log::info!("found {} govee devices", found.len());
    Ok(found.into_values().collect())
}

/// Asks a light for its state.  A light that stays quiet is reported
/// offline rather than as an error.
pub fn status(host: &str, port: Option<u16>) -> Result<GoveeStatus, Error> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, LAN_LISTEN_PORT))?;
    let request = serde_json::to_vec(&Message::dev_status().into_envelope())?;
    socket.send_to(&request, (host, port.unwrap_or(LAN_CONTROL_PORT)))?;

    let deadline = Instant::now() + STATUS_TIMEOUT;
    let mut buf = [0u8; 1024];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        socket.set_read_timeout(Some(remaining))?;
        let len = match socket.recv_from(&mut buf) {
            Ok((len, _)) => len,
            Err(err) if is_timeout(&err) => break,
            Err(err) => return Err(err.into()),
        };
        let reply = parse_reply(&buf[..len]).ok().and_then(|msg| msg.dev_status_reply());
        if let Some(reply) = reply {
            return Ok(GoveeStatus {
                online: true,
                power: Some(reply.on_off == 1),
                brightness: Some(reply.brightness),
                color: reply.color,
            });
        }
    }
    log::warn!("govee light {} did not answer", host);
    Ok(GoveeStatus::default())
}

fn receive_until(socket: &UdpSocket, deadline: Instant) -> Result<Vec<Vec<u8>>, Error> {
    let mut datagrams = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(datagrams);
        }
        socket.set_read_timeout(Some(remaining))?;
        match socket.recv_from(&mut buf) {
            Ok((len, _)) => datagrams.push(buf[..len].to_vec()),
            Err(err) if is_timeout(&err) => return Ok(datagrams),
            Err(err) => return Err(err.into()),
        }
    }
}

fn device_from_scan(reply: ScanReply) -> Device {
    let mut extra = Map::new();
    for (key, value) in [
        ("bleVersionHard", reply.ble_version_hard),
        ("bleVersionSoft", reply.ble_version_soft),
        ("wifiVersionHard", reply.wifi_version_hard),
        ("wifiVersionSoft", reply.wifi_version_soft),
    ] {
        if let Some(value) = value {
            extra.insert(key.to_string(), value.into());
        }
    }
    Device {
        id: reply.device,
        name: reply.sku.clone(),
        host: reply.ip,
        port: Some(LAN_CONTROL_PORT),
        model: Some(reply.sku),
        extra,
    }
}

/// Client for the Govee developer cloud API.
pub struct GoveeCloudClient {
    base: String,
    agent: ureq::Agent,
}

impl GoveeCloudClient {
    pub fn new(base: &str, proxy_url: Option<&str>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            agent: default_ureq_agent_builder(proxy_url)
                .http_status_as_error(false)
                .build()
                .into(),
        }
    }

    pub fn devices(&self, api_key: &str) -> Result<Value, Error> {
        let request = self
            .agent
            .get(&format!("{}/devices", self.base))
            .header("Govee-API-Key", api_key);
        Self::read_reply(request.call()?)
    }

    pub fn control(
        &self,
        api_key: &str,
        device: &str,
        model: &str,
        cmd: &Value,
    ) -> Result<Value, Error> {
        let body = CloudControl { device, model, cmd };
        let request = self
            .agent
            .put(&format!("{}/devices/control", self.base))
            .header("Govee-API-Key", api_key);
        Self::read_reply(request.send_json(&body)?)
    }

    pub fn state(&self, api_key: &str, device: &str, model: &str) -> Result<Value, Error> {
        let request = self
            .agent
            .get(&format!("{}/devices/state", self.base))
            .query("device", device)
            .query("model", model)
            .header("Govee-API-Key", api_key);
        Self::read_reply(request.call()?)
    }

    fn read_reply(mut response: ureq::http::Response<ureq::Body>) -> Result<Value, Error> {
        let status = response.status();
        let body: Value = response.body_mut().read_json().unwrap_or(Value::Null);
        if status.is_success() {
            Ok(body)
        } else {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            Err(Error::UnexpectedResponse(message))
        }
    }
}
