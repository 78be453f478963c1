//! `deploychart` - Deployment status charting for wireless mesh rollouts
//!
//! This library reads where devices were installed, probes them, and renders
//! the health of every site, mount point and radio link onto a map.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod assess;
pub mod cli;
pub mod config;
pub mod datastore;
pub mod device;
pub mod error;
pub mod feature;
pub mod geo;
pub mod http;
pub mod install;
pub mod logging;
pub mod monitor;
pub mod pipeline;
pub mod probe;
pub mod render;
pub mod status;
pub mod topology;

pub use config::Config;
pub use datastore::{Datastore, LoadSummary};
pub use device::SectorDevice;
pub use error::{Error, Result};
pub use feature::{DeploymentFeature, Subtype};
pub use logging::init_logging;
pub use pipeline::{Pipeline, RunReport};
pub use status::Status;
pub use topology::Topology;
