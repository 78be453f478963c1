//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::config::DataLocation;
use crate::feature::Subtype;

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Print the run report as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Write the map here instead of the configured path
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write the assessed features as GeoJSON
    #[arg(long, value_name = "FILE")]
    pub export_geojson: Option<PathBuf>,
}

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Seconds between refreshes (overrides the configured interval)
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Write the map here instead of the configured path
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Topology command arguments.
#[derive(Debug, Args)]
pub struct TopologyCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Feature datastore commands.
#[derive(Debug, Subcommand)]
pub enum FeaturesCommand {
    /// List loaded features
    List {
        /// Only show features of this subtype
        #[arg(short, long, value_enum)]
        subtype: Option<SubtypeArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Save loaded features to another location
    Export {
        /// Where to save
        #[arg(long, value_enum)]
        to: LocationArg,

        /// Folder or file to write (defaults to the configured one)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Remove empty properties and save
    Clean,

    /// Fill in point altitudes from the elevation service and save
    Altitude {
        /// Metres added to ground elevation
        #[arg(long, default_value = "0")]
        offset: f64,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// Feature subtype argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SubtypeArg {
    /// Deployment sites
    Site,
    /// Device mount points
    Mountpoint,
    /// Survey observations
    Observation,
    /// Devices
    Device,
    /// Radio links
    Link,
}

impl From<SubtypeArg> for Subtype {
    fn from(arg: SubtypeArg) -> Self {
        match arg {
            SubtypeArg::Site => Self::Site,
            SubtypeArg::Mountpoint => Self::Mountpoint,
            SubtypeArg::Observation => Self::Observation,
            SubtypeArg::Device => Self::Device,
            SubtypeArg::Link => Self::Link,
        }
    }
}

/// Datastore location argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LocationArg {
    /// One file per feature, grouped by subtype
    Folder,
    /// A single FeatureCollection file
    File,
    /// A GitHub gist
    Gist,
}

impl From<LocationArg> for DataLocation {
    fn from(arg: LocationArg) -> Self {
        match arg {
            LocationArg::Folder => Self::Folder,
            LocationArg::File => Self::File,
            LocationArg::Gist => Self::Gist,
        }
    }
}
