//! Configuration management for deploychart.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML or JSON config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feature::Subtype;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "deploychart";

/// Environment variable prefix.
const ENV_PREFIX: &str = "DEPLOYCHART_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `DEPLOYCHART_`, sections split by `__`)
/// 2. Config file at `~/.config/deploychart/config.toml` (`.json` files are read as JSON)
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where install records come from.
    pub install: InstallConfig,
    /// Quip access.
    pub quip: QuipConfig,
    /// Where deployment features are loaded from and saved to.
    pub datastore: DatastoreConfig,
    /// GitHub access for gists.
    pub github: GithubConfig,
    /// Device probing.
    pub probe: ProbeConfig,
    /// Map rendering.
    pub map: MapConfig,
    /// Watch loop.
    pub watch: WatchConfig,
    /// Elevation lookups.
    pub elevation: ElevationConfig,
    /// Shared HTTP client settings.
    pub http: HttpConfig,
}

/// Kind of install record source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallSourceKind {
    /// A Quip spreadsheet thread.
    #[default]
    Quip,
    /// A local JSON file.
    File,
}

/// Install record configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Which source to read install records from.
    pub source: InstallSourceKind,
    /// JSON file used when `source = "file"`.
    pub file: Option<PathBuf>,
}

/// Quip configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuipConfig {
    /// Personal access token.
    pub api_key: Option<String>,
    /// Thread holding the install spreadsheet.
    pub thread_id: Option<String>,
    /// Platform API base URL.
    pub base_url: String,
}

/// Where features are loaded from or saved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataLocation {
    /// A folder tree of one feature per file.
    Folder,
    /// A single FeatureCollection file.
    #[default]
    File,
    /// A GitHub gist.
    Gist,
    /// Nowhere.
    None,
}

/// Datastore configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    /// Where to load features from.
    pub load: DataLocation,
    /// Where `features` commands save to.
    pub save: DataLocation,
    /// Folder used by the `folder` location.
    pub folder: PathBuf,
    /// File used by the `file` location.
    pub file: PathBuf,
    /// Gist used by the `gist` location.
    pub gist_id: Option<String>,
    /// Subtype assigned to features that do not declare one.
    pub default_subtype: Subtype,
}

/// GitHub configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Personal access token with the `gist` scope.
    pub token: Option<String>,
    /// REST API base URL.
    pub api_url: String,
}

/// Probe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Ping program and arguments; the address is appended.
    pub ping_command: Vec<String>,
    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,
    /// Port checked by the login probe.
    pub login_port: u16,
    /// Maximum number of devices probed at once.
    pub concurrency: usize,
}

/// Map configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial map centre latitude.
    pub center_lat: f64,
    /// Initial map centre longitude.
    pub center_lng: f64,
    /// Initial zoom level.
    pub zoom: u8,
    /// Page title.
    pub title: String,
    /// Where the HTML map is written.
    pub output_path: PathBuf,
    /// Tile layer URL template.
    pub tile_url: String,
    /// Tile layer attribution.
    pub attribution: String,
    /// Popup width in pixels.
    pub popup_width: u32,
    /// Popup height in pixels.
    pub popup_height: u32,
}

/// Watch loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between chart refreshes.
    pub interval_secs: u64,
}

/// Elevation service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    /// Service endpoint.
    pub base_url: String,
    /// API key, appended as `key=`.
    pub api_key: Option<String>,
    /// Pause after each request in milliseconds.
    pub request_delay_ms: u64,
}

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for QuipConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            thread_id: None,
            base_url: "https://platform.quip.com".to_string(),
        }
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            load: DataLocation::File,
            save: DataLocation::File,
            folder: PathBuf::from("features"),
            file: PathBuf::from("deployment.geojson"),
            gist_id: None,
            default_subtype: Subtype::Site,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ping_command: default_ping_command(),
            timeout_ms: 3_000,
            login_port: 22,
            concurrency: 16,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: 37.484_511,
            center_lng: -122.147_1,
            zoom: 18,
            title: "Deployment Status".to_string(),
            output_path: PathBuf::from("deployment_chart.html"),
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
            popup_width: 350,
            popup_height: 350,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/elevation/json".to_string(),
            api_key: None,
            request_delay_ms: 1_000,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Default IPv6 ping invocation for the host platform.
fn default_ping_command() -> Vec<String> {
    let args: &[&str] = if cfg!(target_os = "macos") {
        &["ping6", "-c", "1"]
    } else {
        &["ping", "-6", "-c", "1"]
    };
    args.iter().map(ToString::to_string).collect()
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = if is_json(&config_file) {
            figment.merge(Json::file(&config_file))
        } else {
            figment.merge(Toml::file(&config_file))
        };
        let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::ConfigValidation { message });

        if !(-90.0..=90.0).contains(&self.map.center_lat) {
            return invalid(format!(
                "map.center_lat ({}) must be within -90..=90",
                self.map.center_lat
            ));
        }
        if !(-180.0..=180.0).contains(&self.map.center_lng) {
            return invalid(format!(
                "map.center_lng ({}) must be within -180..=180",
                self.map.center_lng
            ));
        }
        if self.map.zoom > 22 {
            return invalid(format!("map.zoom ({}) must be at most 22", self.map.zoom));
        }
        if self.map.popup_width == 0 || self.map.popup_height == 0 {
            return invalid("map popup dimensions must be greater than 0".to_string());
        }
        if self.watch.interval_secs == 0 {
            return invalid("watch.interval_secs must be greater than 0".to_string());
        }
        if self.probe.concurrency == 0 {
            return invalid("probe.concurrency must be greater than 0".to_string());
        }
        if self.probe.timeout_ms == 0 {
            return invalid("probe.timeout_ms must be greater than 0".to_string());
        }
        if self.probe.ping_command.is_empty() {
            return invalid("probe.ping_command must not be empty".to_string());
        }
        if self.http.timeout_secs == 0 {
            return invalid("http.timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Quip token and thread id.
    ///
    /// # Errors
    ///
    /// Returns `MissingSetting` if either is unset.
    pub fn quip_credentials(&self) -> Result<(&str, &str)> {
        let token = self
            .quip
            .api_key
            .as_deref()
            .ok_or(Error::MissingSetting {
                name: "quip.api_key",
            })?;
        let thread = self
            .quip
            .thread_id
            .as_deref()
            .ok_or(Error::MissingSetting {
                name: "quip.thread_id",
            })?;
        Ok((token, thread))
    }

    /// Configured gist id.
    ///
    /// # Errors
    ///
    /// Returns `MissingSetting` if unset.
    pub fn gist_id(&self) -> Result<&str> {
        self.datastore
            .gist_id
            .as_deref()
            .ok_or(Error::MissingSetting {
                name: "datastore.gist_id",
            })
    }

    /// Get the probe timeout as a Duration.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe.timeout_ms)
    }

    /// Get the watch interval as a Duration.
    #[must_use]
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch.interval_secs)
    }

    /// Get the HTTP timeout as a Duration.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
