//! Relating install records to deployment features.
//!
//! The install sheet names locations and links by their human readable
//! description. These helpers group devices under those names, re-key the
//! groups by feature id, and build the device list the probes run against.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::warn;

use crate::device::SectorDevice;
use crate::feature::DeploymentFeature;
use crate::install::InstallRecord;

/// Key (location or link) to the hostnames of devices found there.
pub type DeviceMap = BTreeMap<String, Vec<String>>;

/// A device map re-keyed by feature id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpatialMap {
    /// Feature id → hostnames.
    pub resolved: DeviceMap,
    /// Names that match no feature description.
    pub unresolved: Vec<String>,
}

/// Devices built from the install sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceSet {
    /// Devices at a known location, sorted by id.
    pub devices: Vec<SectorDevice>,
    /// Hostnames referenced by a link but not at any known location.
    pub orphans: Vec<String>,
}

/// Devices resolved against the features they are installed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Topology {
    /// Devices per location feature.
    pub nodes: SpatialMap,
    /// Devices per link feature.
    pub links: SpatialMap,
    /// Links touching each location.
    pub graph: BTreeMap<String, Vec<String>>,
    /// Devices to probe.
    pub devices: DeviceSet,
}

impl Topology {
    /// Resolve installed sector records against `features`.
    #[must_use]
    pub fn resolve(features: &[DeploymentFeature], sectors: &[InstallRecord]) -> Self {
        let nodes = apply_spatial_map(features, devices_by_location(sectors));
        let links = apply_spatial_map(features, devices_by_link(sectors));
        let graph = node_level_graph(&nodes.resolved, &links.resolved);
        let devices = build_devices(&nodes.resolved, &links.resolved, sectors);
        Self {
            nodes,
            links,
            graph,
            devices,
        }
    }
}

/// Group hostnames by location description.
#[must_use]
pub fn devices_by_location(records: &[InstallRecord]) -> DeviceMap {
    group_by(records, |record| &record.location_description)
}

/// Group hostnames by associated radio link.
#[must_use]
pub fn devices_by_link(records: &[InstallRecord]) -> DeviceMap {
    group_by(records, |record| &record.associated_link)
}

fn group_by(records: &[InstallRecord], key: impl Fn(&InstallRecord) -> &String) -> DeviceMap {
    let mut map = DeviceMap::new();
    for record in records {
        let name = key(record).trim();
        if name.is_empty() {
            continue;
        }
        map.entry(name.to_string())
            .or_default()
            .push(record.hostname.clone());
    }
    map
}

/// Re-key a device map from feature descriptions to feature ids.
///
/// Features without a `desc` are ignored. Names that match no feature are
/// logged and returned in `unresolved`.
#[must_use]
pub fn apply_spatial_map<'a>(
    features: impl IntoIterator<Item = &'a DeploymentFeature>,
    device_map: DeviceMap,
) -> SpatialMap {
    let name_map: BTreeMap<&str, &str> = features
        .into_iter()
        .filter_map(|feature| feature.description().map(|desc| (desc, feature.id())))
        .collect();

    let mut spatial = SpatialMap::default();
    for (name, hostnames) in device_map {
        match name_map.get(name.as_str()) {
            Some(id) => spatial
                .resolved
                .entry((*id).to_string())
                .or_default()
                .extend(hostnames),
            None => {
                warn!("No feature is described as '{name}'; check the mapping");
                spatial.unresolved.push(name);
            }
        }
    }
    spatial
}

/// Adjacency list from each node to the links that share a device with it.
#[must_use]
pub fn node_level_graph(nodes: &DeviceMap, links: &DeviceMap) -> BTreeMap<String, Vec<String>> {
    let mut graph = BTreeMap::new();
    for (node_id, node_devices) in nodes {
        let node_devices: BTreeSet<&String> = node_devices.iter().collect();
        let connected: Vec<String> = links
            .iter()
            .filter(|(_, link_devices)| link_devices.iter().any(|d| node_devices.contains(d)))
            .map(|(link_id, _)| link_id.clone())
            .collect();
        if !connected.is_empty() {
            graph.insert(node_id.clone(), connected);
        }
    }
    graph
}

/// Build one device per hostname found at a node, attach radio links, and
/// copy management details from the install records.
#[must_use]
pub fn build_devices(nodes: &DeviceMap, links: &DeviceMap, records: &[InstallRecord]) -> DeviceSet {
    let mut devices: BTreeMap<String, SectorDevice> = BTreeMap::new();
    for (node_id, hostnames) in nodes {
        for hostname in hostnames {
            devices.insert(
                hostname.clone(),
                SectorDevice::new(hostname.clone(), Some(node_id.clone())),
            );
        }
    }

    let mut orphans = BTreeSet::new();
    for (link_id, hostnames) in links {
        for hostname in hostnames {
            match devices.get_mut(hostname) {
                Some(device) => device.radio_link_id = Some(link_id.clone()),
                None => {
                    warn!(
                        "{hostname} is referenced as a device, but its location is not known"
                    );
                    orphans.insert(hostname.clone());
                }
            }
        }
    }

    for record in records {
        if let Some(device) = devices.get_mut(&record.hostname) {
            device.oob_ip_address = Some(record.ipv6_admin_address.trim().to_string());
            device.hostname = Some(record.hostname.clone());
        }
    }

    DeviceSet {
        devices: devices.into_values().collect(),
        orphans: orphans.into_iter().collect(),
    }
}
