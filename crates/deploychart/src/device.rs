//! Deployed network devices.

use serde::Serialize;

use crate::status::Status;

/// A deployed sector radio.
///
/// Each status comes from an independent probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorDevice {
    /// Unique device id (the hostname from the install sheet).
    pub id: String,
    /// Hostname as recorded in the install sheet.
    pub hostname: Option<String>,
    /// Out-of-band management address.
    pub oob_ip_address: Option<String>,
    /// Feature id of the mountpoint the device is installed on.
    pub mount_point_id: Option<String>,
    /// Feature id of the radio link the device serves.
    pub radio_link_id: Option<String>,
    /// Login user for management access.
    pub username: String,
    /// Result of the ping probe.
    pub status_ping: Status,
    /// Result of the login probe.
    pub status_login: Status,
    /// Result of the radio link assessment.
    pub status_radio_link: Status,
}

impl SectorDevice {
    /// Create a device mounted on `mount_point_id` with every status unknown.
    #[must_use]
    pub fn new(id: impl Into<String>, mount_point_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            hostname: None,
            oob_ip_address: None,
            mount_point_id,
            radio_link_id: None,
            username: "root".to_string(),
            status_ping: Status::Unknown,
            status_login: Status::Unknown,
            status_radio_link: Status::Unknown,
        }
    }

    /// Whether the device is installed on the given feature.
    #[must_use]
    pub fn is_mounted_on(&self, feature_id: &str) -> bool {
        self.mount_point_id.as_deref() == Some(feature_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_device_defaults() {
        let device = SectorDevice::new("sec-1", Some("mp-1".to_string()));
        assert_eq!(device.id, "sec-1");
        assert_eq!(device.username, "root");
        assert_eq!(device.status_ping, Status::Unknown);
        assert_eq!(device.status_login, Status::Unknown);
        assert_eq!(device.status_radio_link, Status::Unknown);
        assert!(device.oob_ip_address.is_none());
        assert!(device.radio_link_id.is_none());
    }

    #[test]
    fn test_is_mounted_on() {
        let device = SectorDevice::new("sec-1", Some("mp-1".to_string()));
        assert!(device.is_mounted_on("mp-1"));
        assert!(!device.is_mounted_on("mp-2"));
        assert!(!SectorDevice::new("x", None).is_mounted_on("mp-1"));
    }

    #[test]
    fn test_device_serializes_statuses() {
        let mut device = SectorDevice::new("sec-1", None);
        device.status_ping = Status::PartialUp;
        let json = serde_json::to_string(&device).unwrap();
        assert!(json.contains("\"status_ping\":\"partial-up\""));
    }
}
