use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde_json::{json, Value};

use crate::{
    content::cloud::{cloud_config_url, passphrase_word_count, DEFAULT_CONFIG_KIND},
    error::Error,
    surface::StatusVariant,
    util::default_agent,
};

pub const CUSTOM_CONFIG_FILE: &str = "app-config.custom.json";
pub const BUNDLED_CONFIG_FILE: &str = "app-config.json";

/// Where the active document came from.  Only used for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentSource {
    Cloud,
    Custom { path: String },
    Bundled { path: String },
    Empty,
}

impl ContentSource {
    /// Line shown in the settings panel next to the passphrase field.
    pub fn info_text(&self, passphrase: Option<&str>) -> String {
        if let Some(passphrase) = passphrase.map(str::trim).filter(|p| !p.is_empty()) {
            return format!(
                "Using cloud config with your {}-word passphrase. Always fetches fresh from the cloud.",
                passphrase_word_count(passphrase)
            );
        }
        match self {
            ContentSource::Custom { path } => format!("Using local kid-mode override ({}).", path),
            ContentSource::Bundled { path } => format!("Using bundled kid-mode buttons ({}).", path),
            ContentSource::Empty => "No kid-mode buttons available. Check your config files.".into(),
            ContentSource::Cloud => "No passphrase set. Using bundled default buttons.".into(),
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Cloud => f.write_str("cloud"),
            ContentSource::Custom { .. } => f.write_str("custom"),
            ContentSource::Bundled { .. } => f.write_str("bundled"),
            ContentSource::Empty => f.write_str("empty"),
        }
    }
}

/// Result of one pass through the fallback chain.
#[derive(Clone, Debug)]
pub struct LoadedContent {
    pub document: Value,
    pub source: ContentSource,
    /// Status toasts to show, in order.
    pub statuses: Vec<(StatusVariant, String)>,
}

/// Source of configuration documents.
pub trait ContentProvider: Send + Sync {
    /// Fetches a remote document, bypassing any cache.
    fn fetch_url(&self, url: &str) -> Result<Value, Error>;

    /// Fetches a local candidate by file name.  `Ok(None)` means the
    /// candidate does not exist, which is not an error.
    fn fetch_local(&self, name: &str) -> Result<Option<Value>, Error>;

    /// Human readable location of a local candidate.
    fn describe_local(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Reads local candidates from a directory, or from an `http(s)://` base
/// when the content is served next to the app.
pub struct DefaultProvider {
    base: String,
    agent: ureq::Agent,
}

impl DefaultProvider {
    pub fn new(base: impl Into<String>, proxy_url: Option<&str>) -> Self {
        Self {
            base: base.into(),
            agent: default_agent(proxy_url),
        }
    }

    fn is_remote_base(&self) -> bool {
        self.base.starts_with("http://") || self.base.starts_with("https://")
    }

    fn local_path(&self, name: &str) -> PathBuf {
        Path::new(&self.base).join(name)
    }

    fn fetch_local_http(&self, name: &str) -> Result<Option<Value>, Error> {
        let url = format!("{}/{}", self.base.trim_end_matches('/'), name);
        let mut response = match self
            .agent
            .get(&url)
            .header("Cache-Control", "no-cache")
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/html"));
        if is_html {
            // Dev servers answer missing files with their index page.
            return Ok(None);
        }
        Ok(Some(response.body_mut().read_json()?))
    }

    fn fetch_local_file(&self, name: &str) -> Result<Option<Value>, Error> {
        let text = match fs::read_to_string(self.local_path(name)) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if text.trim_start().starts_with('<') {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}

impl ContentProvider for DefaultProvider {
    fn fetch_url(&self, url: &str) -> Result<Value, Error> {
        let mut response = self
            .agent
            .get(url)
            .header("Cache-Control", "no-cache")
            .call()?;
        Ok(response.body_mut().read_json()?)
    }

    fn fetch_local(&self, name: &str) -> Result<Option<Value>, Error> {
        if self.is_remote_base() {
            self.fetch_local_http(name)
        } else {
            self.fetch_local_file(name)
        }
    }

    fn describe_local(&self, name: &str) -> String {
        if self.is_remote_base() {
            format!("{}/{}", self.base.trim_end_matches('/'), name)
        } else {
            self.local_path(name).display().to_string()
        }
    }
}

/// Runs the fallback chain: cloud (when a passphrase is set), then the
/// custom override, then the bundled defaults, then an empty document.
/// Never fails.
pub fn load_content(
    provider: &dyn ContentProvider,
    passphrase: Option<&str>,
    cloud_base: &str,
    force_refresh: bool,
) -> LoadedContent {
    let passphrase = passphrase.map(str::trim).filter(|p| !p.is_empty());
    let mut statuses = Vec::new();
    log::debug!(
        "loading content (force_refresh: {}, passphrase: {})",
        force_refresh,
        passphrase.is_some()
    );

    if let Some(passphrase) = passphrase {
        let fetched = cloud_config_url(cloud_base, passphrase, DEFAULT_CONFIG_KIND)
            .and_then(|url| provider.fetch_url(url.as_str()));
        match fetched {
            Ok(document) => {
                log::info!("content loaded from cloud");
                statuses.push((
                    StatusVariant::Success,
                    "Kid-mode buttons loaded from cloud.".to_string(),
                ));
                return LoadedContent {
                    document,
                    source: ContentSource::Cloud,
                    statuses,
                };
            }
            Err(err) => {
                log::error!("failed to fetch cloud content: {}", err);
                statuses.push((
                    StatusVariant::Error,
                    "Cloud config failed. Falling back to local config.".to_string(),
                ));
            }
        }
    }

    for name in [CUSTOM_CONFIG_FILE, BUNDLED_CONFIG_FILE] {
        let document = match provider.fetch_local(name) {
            Ok(Some(document)) => document,
            Ok(None) => {
                log::debug!("no content at {}", provider.describe_local(name));
                continue;
            }
            Err(err) => {
                if name != CUSTOM_CONFIG_FILE {
                    log::warn!("failed to read content from {}: {}", name, err);
                }
                continue;
            }
        };
        let path = provider.describe_local(name);
        let source = if name == CUSTOM_CONFIG_FILE {
            ContentSource::Custom { path }
        } else {
            ContentSource::Bundled { path }
        };
        log::info!("content loaded from {}", source);
        if passphrase.is_none() {
            let message = match source {
                ContentSource::Custom { .. } => "Kid-mode buttons loaded from local override.",
                _ => "Kid-mode buttons loaded from bundled defaults.",
            };
            statuses.push((StatusVariant::Info, message.to_string()));
        }
        return LoadedContent {
            document,
            source,
            statuses,
        };
    }

    log::error!("failed to load kid-mode buttons from any source");
    statuses.push((
        StatusVariant::Error,
        "Could not load kid-mode buttons. Check your config files.".to_string(),
    ));
    LoadedContent {
        document: json!({ "tabs": [] }),
        source: ContentSource::Empty,
        statuses,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        thread,
    };

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct MockProvider {
        cloud: Option<Value>,
        custom: Option<Value>,
        bundled: Option<Value>,
        custom_broken: bool,
        calls: Mutex<Vec<String>>,
    }

    impl ContentProvider for MockProvider {
        fn fetch_url(&self, url: &str) -> Result<Value, Error> {
            self.calls.lock().push(url.to_string());
            self.cloud.clone().ok_or(Error::HttpStatus(500))
        }

        fn fetch_local(&self, name: &str) -> Result<Option<Value>, Error> {
            self.calls.lock().push(name.to_string());
            match name {
                CUSTOM_CONFIG_FILE if self.custom_broken => {
                    Err(Error::UnexpectedResponse("bad json".into()))
                }
                CUSTOM_CONFIG_FILE => Ok(self.custom.clone()),
                _ => Ok(self.bundled.clone()),
            }
        }
    }

    const BASE: &str = "https://example.net/api/config";
    const PASSPHRASE: &str = "one two three four five";

    fn doc(tag: &str) -> Value {
        json!({ "tabs": [], "version": tag })
    }

    #[test]
    fn cloud_wins_when_passphrase_is_set() {
        let provider = MockProvider {
            cloud: Some(doc("cloud")),
            custom: Some(doc("custom")),
            ..MockProvider::default()
        };
        let loaded = load_content(&provider, Some(PASSPHRASE), BASE, true);
        assert_eq!(loaded.source, ContentSource::Cloud);
        assert_eq!(loaded.document, doc("cloud"));
        assert_eq!(provider.calls.lock().len(), 1);
        assert_eq!(
            loaded.statuses,
            vec![(
                StatusVariant::Success,
                "Kid-mode buttons loaded from cloud.".to_string()
            )]
        );
    }

    #[test]
    fn cloud_failure_falls_back_to_custom() {
        let provider = MockProvider {
            custom: Some(doc("custom")),
            bundled: Some(doc("bundled")),
            ..MockProvider::default()
        };
        let loaded = load_content(&provider, Some(PASSPHRASE), BASE, false);
        assert_eq!(
            loaded.source,
            ContentSource::Custom {
                path: CUSTOM_CONFIG_FILE.into()
            }
        );
        assert_eq!(loaded.document, doc("custom"));
        // The local source is not announced while a passphrase is configured.
        assert_eq!(loaded.statuses.len(), 1);
        assert_eq!(loaded.statuses[0].0, StatusVariant::Error);
    }

    #[test]
    fn blank_passphrase_skips_cloud() {
        let provider = MockProvider {
            cloud: Some(doc("cloud")),
            bundled: Some(doc("bundled")),
            ..MockProvider::default()
        };
        let loaded = load_content(&provider, Some("   "), BASE, false);
        assert_eq!(
            loaded.source,
            ContentSource::Bundled {
                path: BUNDLED_CONFIG_FILE.into()
            }
        );
        assert_eq!(
            *provider.calls.lock(),
            vec![CUSTOM_CONFIG_FILE.to_string(), BUNDLED_CONFIG_FILE.to_string()]
        );
        assert_eq!(
            loaded.statuses[0].1,
            "Kid-mode buttons loaded from bundled defaults."
        );
    }

    #[test]
    fn broken_custom_file_is_skipped() {
        let provider = MockProvider {
            custom_broken: true,
            bundled: Some(doc("bundled")),
            ..MockProvider::default()
        };
        let loaded = load_content(&provider, None, BASE, false);
        assert_eq!(loaded.document, doc("bundled"));
    }

    #[test]
    fn nothing_available_yields_empty_document() {
        let provider = MockProvider::default();
        let loaded = load_content(&provider, None, BASE, false);
        assert_eq!(loaded.source, ContentSource::Empty);
        assert_eq!(loaded.document, json!({ "tabs": [] }));
        assert_eq!(
            loaded.statuses,
            vec![(
                StatusVariant::Error,
                "Could not load kid-mode buttons. Check your config files.".to_string()
            )]
        );
    }

    #[test]
    fn local_files_treat_missing_and_html_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DefaultProvider::new(dir.path().to_string_lossy(), None);
        assert_eq!(provider.fetch_local(CUSTOM_CONFIG_FILE).unwrap(), None);

        fs::write(dir.path().join(CUSTOM_CONFIG_FILE), "<!doctype html><html></html>").unwrap();
        assert_eq!(provider.fetch_local(CUSTOM_CONFIG_FILE).unwrap(), None);

        fs::write(dir.path().join(BUNDLED_CONFIG_FILE), r#"{ "tabs": [{ "id": "remote" }] }"#)
            .unwrap();
        let loaded = load_content(&provider, None, BASE, false);
        assert!(matches!(loaded.source, ContentSource::Bundled { .. }));
        assert_eq!(loaded.document["tabs"][0]["id"], "remote");
    }

    /// `(path, status line, content type, body)`
    type Route = (&'static str, &'static str, &'static str, &'static str);

    /// Answers `requests` connections with the matching route, or a 404.
    fn serve(routes: Vec<Route>, requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                        break;
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or_default();
                let (status, content_type, body) = routes
                    .iter()
                    .find(|route| route.0 == path)
                    .map(|route| (route.1, route.2, route.3))
                    .unwrap_or(("404 Not Found", "text/plain", "missing"));
                write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    content_type,
                    body.len(),
                    body
                )
                .unwrap();
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn served_html_and_missing_files_are_not_found() {
        let base = serve(
            vec![
                (
                    "/app-config.custom.json",
                    "200 OK",
                    "text/html; charset=utf-8",
                    "<!doctype html><html></html>",
                ),
                (
                    "/app-config.json",
                    "200 OK",
                    "application/json",
                    r#"{ "tabs": [{ "id": "magic" }] }"#,
                ),
            ],
            3,
        );
        let provider = DefaultProvider::new(base.clone(), None);
        assert_eq!(provider.fetch_local("nothing-here.json").unwrap(), None);

        let loaded = load_content(&provider, None, BASE, false);
        assert_eq!(
            loaded.source,
            ContentSource::Bundled {
                path: format!("{}/{}", base, BUNDLED_CONFIG_FILE)
            }
        );
        assert_eq!(loaded.document["tabs"][0]["id"], "magic");
    }

    #[test]
    fn info_text_prefers_passphrase() {
        let source = ContentSource::Bundled {
            path: "config/app-config.json".into(),
        };
        assert_eq!(
            source.info_text(Some(PASSPHRASE)),
            "Using cloud config with your 5-word passphrase. Always fetches fresh from the cloud."
        );
        assert_eq!(
            source.info_text(None),
            "Using bundled kid-mode buttons (config/app-config.json)."
        );
    }
}
