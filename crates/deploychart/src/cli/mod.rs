//! Command-line interface for deploychart.
//!
//! This module provides the CLI structure for the `deploychart` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, FeaturesCommand, LocationArg, RenderCommand, SubtypeArg, TopologyCommand,
    WatchCommand,
};

/// deploychart - Chart the health of a wireless deployment
///
/// Reads the install spreadsheet, probes every installed device and draws
/// the results on an HTML map of the deployment.
#[derive(Debug, Parser)]
#[command(name = "deploychart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Load features from this GeoJSON file or folder instead of the
    /// configured location
    #[arg(short, long, global = true, value_name = "PATH")]
    pub features: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe devices once and render the map
    Render(RenderCommand),

    /// Re-render the map on an interval
    Watch(WatchCommand),

    /// Show devices and how they connect, without probing
    Topology(TopologyCommand),

    /// Inspect and maintain deployment features
    #[command(subcommand)]
    Features(FeaturesCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
