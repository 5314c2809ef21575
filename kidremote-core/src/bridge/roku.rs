use std::{
    collections::BTreeMap,
    net::UdpSocket,
    time::{Duration, Instant},
};

use serde_json::{Map, Value};
use url::Url;

use kidremote_protocol::roku::{
    device_info_field, parse_search_response, search_request, SearchResponse, ECP_PORT, SSDP_ADDR,
};

use crate::{error::Error, registry::Device};

/// Sends one SSDP search and collects replies until `timeout` elapses.
pub fn discover(agent: &ureq::Agent, timeout: Duration) -> Result<Vec<Device>, Error> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.send_to(search_request().as_bytes(), SSDP_ADDR)?;

    let deadline = Instant::now() + timeout;
    let mut found = BTreeMap::new();
    let mut buf = [0u8; 2048];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        socket.set_read_timeout(Some(remaining))?;
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err) if super::network::is_timeout(&err) => break,
            Err(err) => return Err(err.into()),
        };
        let text = String::from_utf8_lossy(&buf[..len]);
        let Some(response) = parse_search_response(&text) else {
            log::debug!("ignoring ssdp reply from {}", from);
            continue;
        };
        if let Some(device) = device_from_response(&response) {
            found.entry(device.id.clone()).or_insert(device);
        }
    }

    let mut devices: Vec<Device> = found.into_values().collect();
    for device in &mut devices {
        describe(agent, device);
    }
    log::info!("found {} roku devices", devices.len());
    Ok(devices)
}

fn device_from_response(response: &SearchResponse) -> Option<Device> {
    let host = response.host()?.to_string();
    let id = response.serial().unwrap_or(&response.usn).to_string();
    let mut extra = Map::new();
    extra.insert("location".into(), response.location.clone().into());
    if let Some(server) = &response.server {
        extra.insert("server".into(), server.clone().into());
    }
    Some(Device {
        id,
        name: "Roku".to_string(),
        host,
        port: Some(ECP_PORT),
        model: None,
        extra,
    })
}

/// Fills in the friendly name and model from `/query/device-info`.  A TV
/// that does not answer keeps the defaults.
fn describe(agent: &ureq::Agent, device: &mut Device) {
    let url = format!("http://{}:{}/query/device-info", device.host, ECP_PORT);
    let xml = match agent
        .get(&url)
        .call()
        .and_then(|mut response| response.body_mut().read_to_string())
    {
        Ok(xml) => xml,
        Err(err) => {
            log::warn!("failed to query roku {}: {}", device.host, err);
            return;
        }
    };
    if let Some(name) = device_info_field(&xml, "user-device-name")
        .or_else(|| device_info_field(&xml, "friendly-device-name"))
    {
        device.name = name.to_string();
    }
    device.model = device_info_field(&xml, "model-name").map(str::to_string);
}

pub fn launch_url(host: &str, app_id: &str, params: &Map<String, Value>) -> Result<Url, Error> {
    if app_id.is_empty() {
        return Err(Error::InvalidInput("missing app id".into()));
    }
    let mut url = Url::parse(&format!("http://{}:{}/", host, ECP_PORT))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidInput(format!("bad TV address {}", host)))?
        .pop_if_empty()
        .extend(["launch", app_id]);
    if !params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (name, value) in params {
            match value {
                Value::String(text) => query.append_pair(name, text),
                Value::Null => continue,
                other => query.append_pair(name, &other.to_string()),
            };
        }
    }
    Ok(url)
}

pub fn launch_app(
    agent: &ureq::Agent,
    host: &str,
    app_id: &str,
    params: &Map<String, Value>,
) -> Result<(), Error> {
    let url = launch_url(host, app_id, params)?;
    log::info!("launching {} on {}", app_id, host);
    agent.post(url.as_str()).send_empty()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn launch_url_carries_params() {
        let params = json!({ "contentId": "abc 123", "mediaType": "live" });
        let url = launch_url("192.168.1.20", "837", params.as_object().unwrap()).unwrap();
        assert_eq!(url.path(), "/launch/837");
        assert_eq!(url.port(), Some(ECP_PORT));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("contentId".to_string(), "abc 123".to_string()),
                ("mediaType".to_string(), "live".to_string()),
            ]
        );
    }

    #[test]
    fn launch_url_without_params_has_no_query() {
        let url = launch_url("10.0.0.5", "12", &Map::new()).unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8060/launch/12");
        assert!(launch_url("10.0.0.5", "", &Map::new()).is_err());
    }

    #[test]
    fn search_response_becomes_device() {
        let response = SearchResponse {
            location: "http://192.168.1.20:8060/".into(),
            usn: "uuid:roku:ecp:X00400ABCDEF".into(),
            server: Some("Roku/9.3.0 UPnP/1.0".into()),
        };
        let device = device_from_response(&response).unwrap();
        assert_eq!(device.id, "X00400ABCDEF");
        assert_eq!(device.host, "192.168.1.20");
        assert_eq!(device.port, Some(8060));
        assert_eq!(device.extra["server"], "Roku/9.3.0 UPnP/1.0");
    }
}
