//! Install records: which device is mounted where, and on which radio link.
//!
//! Records are rows of the deployment team's install spreadsheet. Every
//! value is text; missing columns read as empty strings.

pub mod quip;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, InstallSourceKind};
use crate::error::{Error, Result};

pub use quip::QuipSource;

/// One row of the install spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallRecord {
    /// Device hostname, unique per device.
    pub hostname: String,
    /// Kind of hardware, e.g. `sector`.
    pub device_type: String,
    /// Install progress, e.g. `installed`.
    pub physical_install_status: String,
    /// Out-of-band IPv6 management address.
    pub ipv6_admin_address: String,
    /// Human readable location; matches a feature's `desc`.
    pub location_description: String,
    /// Human readable radio link name; matches a feature's `desc`.
    pub associated_link: String,
    /// Every other column.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl InstallRecord {
    /// Build a record from a column name → value row.
    #[must_use]
    pub fn from_row(mut row: BTreeMap<String, String>) -> Self {
        let mut take = |key: &str| row.remove(key).unwrap_or_default();
        Self {
            hostname: take("hostname"),
            device_type: take("device_type"),
            physical_install_status: take("physical_install_status"),
            ipv6_admin_address: take("ipv6_admin_address"),
            location_description: take("location_description"),
            associated_link: take("associated_link"),
            extra: row,
        }
    }

    /// Whether this row is a sector device that is installed and reachable
    /// on a management address.
    #[must_use]
    pub fn is_installed_sector(&self) -> bool {
        self.device_type.trim().eq_ignore_ascii_case("sector")
            && self
                .physical_install_status
                .trim()
                .eq_ignore_ascii_case("installed")
            && !self.ipv6_admin_address.trim().is_empty()
    }
}

/// Keep only installed sector devices.
#[must_use]
pub fn installed_sectors(records: Vec<InstallRecord>) -> Vec<InstallRecord> {
    records
        .into_iter()
        .filter(InstallRecord::is_installed_sector)
        .collect()
}

/// A place install records can be fetched from.
#[async_trait]
pub trait InstallSource: Send + Sync + std::fmt::Debug {
    /// Name of this source, for logging.
    fn name(&self) -> &'static str;

    /// Fetch every install record.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be retrieved or parsed.
    async fn fetch(&self) -> Result<Vec<InstallRecord>>;
}

/// Install records kept in a local JSON array of objects.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InstallSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self) -> Result<Vec<InstallRecord>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::file_access(&self.path, e))?;
        let rows: Vec<BTreeMap<String, String>> = serde_json::from_str(&text)?;
        debug!("Read {} install rows from {}", rows.len(), self.path.display());
        Ok(rows.into_iter().map(InstallRecord::from_row).collect())
    }
}

/// Build the install source selected by configuration.
///
/// # Errors
///
/// Returns `MissingSetting` if the selected source is not fully configured.
pub fn from_config(config: &Config, http: &Client) -> Result<Box<dyn InstallSource>> {
    match config.install.source {
        InstallSourceKind::Quip => {
            let (token, thread_id) = config.quip_credentials()?;
            Ok(Box::new(QuipSource::new(
                http.clone(),
                &config.quip.base_url,
                token,
                thread_id,
            )))
        }
        InstallSourceKind::File => {
            let path = config.install.file.clone().ok_or(Error::MissingSetting {
                name: "install.file",
            })?;
            Ok(Box::new(FileSource::new(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hostname: &str, location: &str, link: &str) -> InstallRecord {
        InstallRecord {
            hostname: hostname.to_string(),
            device_type: "sector".to_string(),
            physical_install_status: "installed".to_string(),
            ipv6_admin_address: "fd00::1".to_string(),
            location_description: location.to_string(),
            associated_link: link.to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_is_installed_sector() {
        let mut r = record("s1", "Pole 1", "Link A");
        assert!(r.is_installed_sector());

        r.device_type = " Sector ".to_string();
        r.physical_install_status = "INSTALLED".to_string();
        assert!(r.is_installed_sector());

        r.ipv6_admin_address = "  ".to_string();
        assert!(!r.is_installed_sector());
    }

    #[test]
    fn test_not_installed_or_not_sector() {
        let mut r = record("s1", "Pole 1", "Link A");
        r.physical_install_status = "planned".to_string();
        assert!(!r.is_installed_sector());

        let mut r = record("s1", "Pole 1", "Link A");
        r.device_type = "router".to_string();
        assert!(!r.is_installed_sector());
    }

    #[test]
    fn test_installed_sectors_filters() {
        let mut planned = record("s2", "Pole 2", "Link A");
        planned.physical_install_status = "planned".to_string();
        let kept = installed_sectors(vec![record("s1", "Pole 1", "Link A"), planned]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].hostname, "s1");
    }

    #[test]
    fn test_from_row_keeps_extra_columns() {
        let row: BTreeMap<String, String> = [
            ("hostname", "s1"),
            ("device_type", "sector"),
            ("installer", "kim"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let r = InstallRecord::from_row(row);
        assert_eq!(r.hostname, "s1");
        assert_eq!(r.ipv6_admin_address, "");
        assert_eq!(r.extra.get("installer").map(String::as_str), Some("kim"));
    }

    #[tokio::test]
    async fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("install.json");
        std::fs::write(
            &path,
            r#"[{"hostname": "s1", "device_type": "sector",
                 "physical_install_status": "installed",
                 "ipv6_admin_address": "fd00::1",
                 "location_description": "Pole 1", "associated_link": "Link A"},
                {"hostname": "s2", "device_type": "router"}]"#,
        )
        .unwrap();

        let source = FileSource::new(&path);
        assert_eq!(source.name(), "file");
        let records = source.fetch().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(installed_sectors(records).len(), 1);
    }

    #[tokio::test]
    async fn test_file_source_missing() {
        let source = FileSource::new("/nonexistent/install.json");
        let err = source.fetch().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/install.json"));
    }

    #[test]
    fn test_from_config_requires_settings() {
        let http = Client::new();
        let mut config = Config::default();
        let err = from_config(&config, &http).unwrap_err();
        assert!(err.is_missing_setting());

        config.install.source = InstallSourceKind::File;
        let err = from_config(&config, &http).unwrap_err();
        assert!(err.to_string().contains("install.file"));

        config.install.file = Some(PathBuf::from("rows.json"));
        assert_eq!(from_config(&config, &http).unwrap().name(), "file");
    }
}
