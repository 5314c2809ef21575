use std::{
    env,
    env::VarError,
    fs,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};

use crate::error::Error;

const APP_NAME: &str = "KidRemote";
const CONFIG_FILENAME: &str = "config.json";
const STORAGE_FILENAME: &str = "storage.json";
const PROXY_ENV_VAR: &str = "HTTPS_PROXY";

pub const DEFAULT_CLOUD_CONFIG_BASE: &str = "https://toddler-phone-control.netlify.app/api/config";
pub const DEFAULT_GOVEE_CLOUD_BASE: &str = "https://developer-api.govee.com/v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory (or `http(s)://` base URL) holding the bundled and custom
    /// content documents.
    pub content_dir: String,
    pub cloud_config_base: String,
    pub govee_cloud_base: String,
    pub discovery_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: "config".to_string(),
            cloud_config_base: DEFAULT_CLOUD_CONFIG_BASE.to_string(),
            govee_cloud_base: DEFAULT_GOVEE_CLOUD_BASE.to_string(),
            discovery_timeout_ms: 3000,
        }
    }
}

impl Config {
    fn app_dirs() -> Option<AppDirs> {
        const USE_XDG_ON_MACOS: bool = false;

        AppDirs::new(Some(APP_NAME), USE_XDG_ON_MACOS)
    }

    pub fn config_dir() -> Option<PathBuf> {
        Self::app_dirs().map(|dirs| dirs.config_dir)
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILENAME))
    }

    /// Location of the flat key-value store.
    pub fn storage_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(STORAGE_FILENAME))
    }

    /// Loads the config file, writing the defaults there on first run.  A
    /// file that fails to parse is left alone.
    pub fn load_or_create() -> Config {
        match Self::config_path() {
            Some(path) => Self::load_or_create_at(&path),
            None => Config::default(),
        }
    }

    fn load_or_create_at(path: &Path) -> Config {
        if path.exists() {
            return Self::load_from(path).unwrap_or_default();
        }
        let config = Config::default();
        match config.save_to(path) {
            Ok(()) => log::info!("wrote default config: {:?}", path),
            Err(err) => log::warn!("failed to write default config {:?}: {}", path, err),
        }
        config
    }

    fn load_from(path: &Path) -> Option<Config> {
        let file = File::open(path).ok()?;
        log::info!("loading config: {:?}", path);
        match serde_json::from_reader(file) {
            Ok(config) => Some(config),
            Err(err) => {
                log::error!("failed to read config {:?}: {}", path, err);
                None
            }
        }
    }

    fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(dir) = path.parent() {
            mkdir_if_not_exists(dir)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn proxy() -> Option<String> {
        env::var(PROXY_ENV_VAR).map_or_else(
            |err| match err {
                VarError::NotPresent => None,
                VarError::NotUnicode(_) => {
                    log::error!("proxy URL is not a valid unicode");
                    None
                }
            },
            Some,
        )
    }
}

pub fn mkdir_if_not_exists(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).or_else(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            Ok(())
        } else {
            Err(err)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{ "content_dir": "/srv/kid" }"#).unwrap();
        assert_eq!(config.content_dir, "/srv/kid");
        assert_eq!(config.cloud_config_base, DEFAULT_CLOUD_CONFIG_BASE);
        assert_eq!(config.discovery_timeout_ms, 3000);
    }

    #[test]
    fn first_run_writes_defaults_and_keeps_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("KidRemote").join(CONFIG_FILENAME);
        assert_eq!(Config::load_or_create_at(&path), Config::default());
        assert!(path.exists());

        fs::write(&path, r#"{ "discovery_timeout_ms": 500 }"#).unwrap();
        assert_eq!(Config::load_or_create_at(&path).discovery_timeout_ms, 500);

        fs::write(&path, "{ nope").unwrap();
        assert_eq!(Config::load_or_create_at(&path), Config::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ nope");
    }
}
