//! Writing probe results back onto deployment features.

use std::collections::BTreeMap;

use geojson::JsonObject;
use serde_json::Value as JsonValue;

use crate::device::SectorDevice;
use crate::feature::{DeploymentFeature, OVERALL_STATUS_PROPERTY};
use crate::probe::roll_up;
use crate::status::{MarkerSize, Status};

/// Property text for a feature with no devices.
pub const NO_DEVICES: &str = "No known devices installed";

/// Property holding per-device ping results.
pub const PING_STATUS_PROPERTY: &str = "Ping Status";
/// Property holding per-device login results.
pub const LOGIN_STATUS_PROPERTY: &str = "Login Status";
/// Property holding per-device radio link results.
pub const RADIO_STATUS_PROPERTY: &str = "Radio Status";

/// Devices installed on a feature, or serving it when the feature is a link.
fn devices_at<'a>(feature: &DeploymentFeature, devices: &'a [SectorDevice]) -> Vec<&'a SectorDevice> {
    let mut found: Vec<&SectorDevice> = devices
        .iter()
        .filter(|d| d.is_mounted_on(feature.id()) || d.radio_link_id.as_deref() == Some(feature.id()))
        .collect();
    found.sort_by(|a, b| a.id.cmp(&b.id));
    found
}

fn status_lines(devices: &[&SectorDevice], status: impl Fn(&SectorDevice) -> Status) -> String {
    if devices.is_empty() {
        return NO_DEVICES.to_string();
    }
    devices
        .iter()
        .map(|&d| format!("{} is {}", d.id, status(d)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Annotate a single feature and return its overall status.
pub fn update_feature(feature: &mut DeploymentFeature, devices: &[SectorDevice]) -> Status {
    let here = devices_at(feature, devices);

    let mut properties = JsonObject::new();
    properties.insert(
        PING_STATUS_PROPERTY.to_string(),
        status_lines(&here, |d| d.status_ping).into(),
    );
    properties.insert(
        LOGIN_STATUS_PROPERTY.to_string(),
        status_lines(&here, |d| d.status_login).into(),
    );
    properties.insert(
        RADIO_STATUS_PROPERTY.to_string(),
        status_lines(&here, |d| d.status_radio_link).into(),
    );

    let overall = if feature.overall_status() == Some(Status::Testing) {
        Status::Testing
    } else {
        let pings: Vec<Status> = here.iter().map(|d| d.status_ping).collect();
        roll_up(&pings)
    };
    properties.insert(
        OVERALL_STATUS_PROPERTY.to_string(),
        JsonValue::from(overall.as_str()),
    );

    feature.update_properties(properties);
    feature.update_icon(overall.color(), MarkerSize::Small);
    overall
}

/// Annotate every feature with device statuses.
///
/// Returns how many features ended up in each overall status.
pub fn update_features(
    features: &mut [DeploymentFeature],
    devices: &[SectorDevice],
) -> BTreeMap<Status, usize> {
    let mut counts = BTreeMap::new();
    for feature in features.iter_mut() {
        let status = update_feature(feature, devices);
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}
