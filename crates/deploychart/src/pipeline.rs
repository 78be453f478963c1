//! One full chart refresh.
//!
//! Fetch install records, resolve them against the features, probe the
//! devices, write the results onto copies of the features and render the
//! map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assess::update_features;
use crate::config::Config;
use crate::datastore::Datastore;
use crate::device::SectorDevice;
use crate::error::Result;
use crate::feature::DeploymentFeature;
use crate::install::{self, installed_sectors, InstallSource};
use crate::probe::{probe_devices, ProbeSet};
use crate::render::MapRenderer;
use crate::status::Status;
use crate::topology::Topology;

/// Outcome of a single refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Rows read from the install source.
    pub records: usize,
    /// Rows describing installed sector devices.
    pub installed_sectors: usize,
    /// Probed devices.
    pub devices: Vec<SectorDevice>,
    /// Location names matching no feature.
    pub unresolved_locations: Vec<String>,
    /// Link names matching no feature.
    pub unresolved_links: Vec<String>,
    /// Hostnames on a link but at no known location.
    pub orphans: Vec<String>,
    /// Features per overall status.
    pub status_counts: BTreeMap<Status, usize>,
    /// Where the map was written.
    pub output_path: PathBuf,
    /// When the refresh finished.
    pub generated_at: DateTime<Utc>,
    /// Features annotated with this run's statuses.
    #[serde(skip)]
    pub assessed_features: Vec<DeploymentFeature>,
}

/// Everything needed to refresh the chart.
#[derive(Debug)]
pub struct Pipeline {
    source: Box<dyn InstallSource>,
    probes: ProbeSet,
    renderer: MapRenderer,
    output_path: PathBuf,
    concurrency: usize,
}

impl Pipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(
        source: Box<dyn InstallSource>,
        probes: ProbeSet,
        renderer: MapRenderer,
        output_path: impl Into<PathBuf>,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            probes,
            renderer,
            output_path: output_path.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Build the pipeline described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `MissingSetting` if the install source is not configured.
    pub fn from_config(config: &Config, http: &Client) -> Result<Self> {
        Ok(Self::new(
            install::from_config(config, http)?,
            ProbeSet::from_config(config),
            MapRenderer::new(config.map.clone()),
            config.map.output_path.clone(),
            config.probe.concurrency,
        ))
    }

    /// Write the map somewhere else.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Where the map is written.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Fetch install records and resolve them without probing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the install source cannot be read.
    pub async fn topology(&self, store: &Datastore) -> Result<Topology> {
        let records = self.source.fetch().await?;
        let sectors = installed_sectors(records);
        let features: Vec<DeploymentFeature> = store.all().cloned().collect();
        Ok(Topology::resolve(&features, &sectors))
    }

    /// Run one refresh against the features in `store`.
    ///
    /// The store itself is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the install source cannot be read or the map
    /// cannot be written.
    pub async fn run_once(&self, store: &Datastore) -> Result<RunReport> {
        let started = Instant::now();

        let records = self.source.fetch().await?;
        let record_count = records.len();
        let sectors = installed_sectors(records);
        info!(
            "Read {record_count} install records from {}, {} installed sectors",
            self.source.name(),
            sectors.len()
        );

        let mut features: Vec<DeploymentFeature> = store.all().cloned().collect();
        let topology = Topology::resolve(&features, &sectors);
        let mut devices = topology.devices.devices;
        if devices.is_empty() {
            warn!("No installed devices match any feature");
        }

        probe_devices(&mut devices, &self.probes, self.concurrency).await;
        debug!("Probed {} devices in {:?}", devices.len(), started.elapsed());

        let status_counts = update_features(&mut features, &devices);
        self.renderer.write(&self.output_path, &features)?;

        info!(
            "Chart refreshed in {:?}: {}",
            started.elapsed(),
            summarize(&status_counts)
        );

        Ok(RunReport {
            records: record_count,
            installed_sectors: sectors.len(),
            devices,
            unresolved_locations: topology.nodes.unresolved,
            unresolved_links: topology.links.unresolved,
            orphans: topology.devices.orphans,
            status_counts,
            output_path: self.output_path.clone(),
            generated_at: Utc::now(),
            assessed_features: features,
        })
    }
}

/// One-line status tally, e.g. `up: 3, down: 1`.
#[must_use]
pub fn summarize(counts: &BTreeMap<Status, usize>) -> String {
    if counts.is_empty() {
        return "no features".to_string();
    }
    counts
        .iter()
        .map(|(status, count)| format!("{status}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
