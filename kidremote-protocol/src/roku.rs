//! Roku External Control Protocol: SSDP discovery and device-info parsing.

use std::net::{Ipv4Addr, SocketAddrV4};

pub const SSDP_ADDR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);
pub const SEARCH_TARGET: &str = "roku:ecp";
pub const ECP_PORT: u16 = 8060;

/// Channel id of the YouTube app in the Roku channel store.
pub const YOUTUBE_APP_ID: &str = "837";

const USN_PREFIX: &str = "uuid:roku:ecp:";

pub fn search_request() -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         Host: {}\r\n\
         Man: \"ssdp:discover\"\r\n\
         ST: {}\r\n\
         MX: 2\r\n\
         \r\n",
        SSDP_ADDR, SEARCH_TARGET
    )
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchResponse {
    pub location: String,
    pub usn: String,
    pub server: Option<String>,
}

impl SearchResponse {
    /// Serial number of the player, taken from the unique service name.
    pub fn serial(&self) -> Option<&str> {
        self.usn
            .strip_prefix(USN_PREFIX)
            .filter(|serial| !serial.is_empty())
    }

    /// Host part of the `LOCATION` URL, i.e. `192.168.1.20` for
    /// `http://192.168.1.20:8060/`.
    pub fn host(&self) -> Option<&str> {
        let rest = self
            .location
            .strip_prefix("http://")
            .or_else(|| self.location.strip_prefix("https://"))?;
        let authority = rest.split('/').next()?;
        let host = authority.rsplit_once(':').map_or(authority, |(host, _)| host);
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }
}

/// Parses a unicast reply to an `M-SEARCH`.  Replies for other search
/// targets, or without the headers we need, are ignored.
pub fn parse_search_response(text: &str) -> Option<SearchResponse> {
    let mut lines = text.lines();
    let status = lines.next()?;
    if !status.starts_with("HTTP/1.1 200") {
        return None;
    }
    let mut response = SearchResponse::default();
    let mut target_matches = false;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "location" => response.location = value.to_string(),
            "usn" => response.usn = value.to_string(),
            "server" => response.server = Some(value.to_string()),
            "st" => target_matches = value.eq_ignore_ascii_case(SEARCH_TARGET),
            _ => {}
        }
    }
    if target_matches && !response.location.is_empty() && !response.usn.is_empty() {
        Some(response)
    } else {
        None
    }
}

/// Extracts the text content of `<tag>` from a `/query/device-info` reply.
pub fn device_info_field<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    let value = xml[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
