//! Passphrase-addressed cloud storage for configuration documents and
//! discovered device lists.

use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::{
    error::Error,
    registry::{Device, DeviceKind},
    util::{default_ureq_agent_builder, now_rfc3339},
};

pub const DEFAULT_CONFIG_KIND: &str = "app-config";
pub const MIN_PASSPHRASE_WORDS: usize = 5;

pub fn passphrase_word_count(passphrase: &str) -> usize {
    passphrase.split_whitespace().count()
}

pub fn validate_passphrase(passphrase: &str) -> Result<(), String> {
    let trimmed = passphrase.trim();
    if trimmed.is_empty() {
        return Err("Passphrase cannot be empty".to_string());
    }
    let words = passphrase_word_count(trimmed);
    if words < MIN_PASSPHRASE_WORDS {
        return Err(format!(
            "Passphrase must have at least {} words (found {})",
            MIN_PASSPHRASE_WORDS, words
        ));
    }
    Ok(())
}

pub fn cloud_config_url(base: &str, passphrase: &str, kind: &str) -> Result<Url, Error> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut()
        .append_pair("passphrase", passphrase)
        .append_pair("type", kind);
    Ok(url)
}

/// Checks text from the config editor, returning the number of tabs.
pub fn validate_config_json(text: &str) -> Result<usize, String> {
    let document: Value =
        serde_json::from_str(text).map_err(|err| format!("Invalid JSON: {}", err))?;
    document
        .get("tabs")
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| "Invalid config: must have a \"tabs\" array.".to_string())
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveDevicesReply {
    device_count: Option<usize>,
}

pub struct CloudConfigClient {
    agent: ureq::Agent,
    base: String,
}

impl CloudConfigClient {
    pub fn new(base: impl Into<String>, proxy_url: Option<&str>) -> Self {
        let agent = default_ureq_agent_builder(proxy_url)
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base: base.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Stores `document` under `passphrase`.  A rejection carries the
    /// server's own error message when it sends one.
    pub fn save(&self, passphrase: &str, document: &Value) -> Result<(), Error> {
        let mut response = self
            .agent
            .post(&self.base)
            .header("Authorization", format!("Bearer {}", passphrase))
            .send_json(document)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response
            .body_mut()
            .read_json::<ErrorBody>()
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(Error::UnexpectedResponse(message))
    }

    /// Uploads a device list.  Returns `false` without a request when no
    /// passphrase is configured.
    pub fn save_devices(
        &self,
        passphrase: Option<&str>,
        kind: DeviceKind,
        devices: &[Device],
    ) -> Result<bool, Error> {
        let Some(passphrase) = passphrase.map(str::trim).filter(|p| !p.is_empty()) else {
            log::info!("no passphrase set, skipping cloud save for {} devices", kind.as_str());
            return Ok(false);
        };
        let endpoint = format!(
            "{}/{}-devices.json",
            self.base.trim_end_matches('/'),
            kind.as_str()
        );
        let body = json!({
            "devices": devices,
            "timestamp": now_rfc3339(),
            "deviceCount": devices.len(),
        });
        let mut response = self
            .agent
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", passphrase))
            .send_json(&body)?;
        if !response.status().is_success() {
            log::error!(
                "failed to save {} devices to cloud: HTTP {}",
                kind.as_str(),
                response.status().as_u16()
            );
            return Ok(false);
        }
        let saved = response
            .body_mut()
            .read_json::<SaveDevicesReply>()
            .ok()
            .and_then(|reply| reply.device_count)
            .unwrap_or(devices.len());
        log::info!("saved {} {} devices to cloud", saved, kind.as_str());
        Ok(true)
    }
}
