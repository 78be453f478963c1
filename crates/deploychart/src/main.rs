//! `deploychart` - CLI for deployment status charts
//!
//! This binary loads the deployment features, runs the chart pipeline and
//! maintains the feature datastore.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use reqwest::Client;
use tracing::{info, warn};

use deploychart::cli::{
    Cli, Command, ConfigCommand, FeaturesCommand, RenderCommand, TopologyCommand, WatchCommand,
};
use deploychart::config::DataLocation;
use deploychart::datastore::collection_string;
use deploychart::geo::ElevationClient;
use deploychart::http::build_client;
use deploychart::monitor::{watch, WatchHandle};
use deploychart::pipeline::summarize;
use deploychart::{init_logging, Config, Datastore, Pipeline, Subtype};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let Cli {
        config: config_path,
        features,
        command,
        ..
    } = cli;

    // Config commands handle their own loading
    let command = match command {
        Command::Config(config_cmd) => return handle_config(config_path, config_cmd),
        other => other,
    };

    let config = Config::load_from(config_path).context("failed to load configuration")?;
    let http = build_client(&config)?;
    let store = load_store(&config, &http, features.as_deref()).await?;

    match command {
        Command::Render(cmd) => handle_render(&config, &http, &store, cmd).await,
        Command::Watch(cmd) => handle_watch(&config, &http, &store, cmd).await,
        Command::Topology(cmd) => handle_topology(&config, &http, &store, &cmd).await,
        Command::Features(cmd) => handle_features(&config, &http, store, cmd).await,
        Command::Config(_) => Ok(()),
    }
}

async fn load_store(config: &Config, http: &Client, path: Option<&Path>) -> anyhow::Result<Datastore> {
    let mut store = Datastore::new(config.datastore.default_subtype);
    let summary = match path {
        Some(path) if path.is_dir() => store.load_folder(path)?,
        Some(path) => store.load_geojson_file(path)?,
        None => store
            .load_location(config.datastore.load, config, http)
            .await
            .context("failed to load deployment features")?,
    };
    if summary.failed > 0 {
        warn!("{} features could not be loaded", summary.failed);
    }
    info!("Loaded {} features", summary.loaded);
    Ok(store)
}

fn pipeline(config: &Config, http: &Client, output: Option<PathBuf>) -> anyhow::Result<Pipeline> {
    let pipeline = Pipeline::from_config(config, http).context("failed to set up the pipeline")?;
    Ok(match output {
        Some(path) => pipeline.with_output_path(path),
        None => pipeline,
    })
}

async fn handle_render(
    config: &Config,
    http: &Client,
    store: &Datastore,
    cmd: RenderCommand,
) -> anyhow::Result<()> {
    let pipeline = pipeline(config, http, cmd.output)?;
    let report = pipeline.run_once(store).await?;

    if let Some(path) = &cmd.export_geojson {
        let document = collection_string(&report.assessed_features)?;
        std::fs::write(path, document)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Exported assessed features to {}", path.display());
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Chart written to {}", report.output_path.display());
        println!(
            "  Install records:  {} ({} installed sectors)",
            report.records, report.installed_sectors
        );
        println!("  Devices probed:   {}", report.devices.len());
        println!("  Features:         {}", summarize(&report.status_counts));
        if !report.unresolved_locations.is_empty() {
            println!(
                "  Unknown locations: {}",
                report.unresolved_locations.join(", ")
            );
        }
        if !report.unresolved_links.is_empty() {
            println!("  Unknown links:    {}", report.unresolved_links.join(", "));
        }
        if !report.orphans.is_empty() {
            println!("  Orphan devices:   {}", report.orphans.join(", "));
        }
    }
    Ok(())
}

async fn handle_watch(
    config: &Config,
    http: &Client,
    store: &Datastore,
    cmd: WatchCommand,
) -> anyhow::Result<()> {
    let interval = cmd
        .interval
        .map_or_else(|| config.watch_interval(), Duration::from_secs);
    if interval.is_zero() {
        bail!("watch interval must be greater than zero");
    }

    let pipeline = pipeline(config, http, cmd.output)?;
    let summary = watch(&pipeline, store, interval, &WatchHandle::new()).await;
    println!(
        "Stopped after {} refreshes ({} failed)",
        summary.succeeded + summary.failed,
        summary.failed
    );
    Ok(())
}

async fn handle_topology(
    config: &Config,
    http: &Client,
    store: &Datastore,
    cmd: &TopologyCommand,
) -> anyhow::Result<()> {
    let topology = pipeline(config, http, None)?.topology(store).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&topology)?);
        return Ok(());
    }

    println!("Devices");
    println!("-------");
    for device in &topology.devices.devices {
        println!(
            "  {:<20} at {:<16} link {:<16} {}",
            device.id,
            device.mount_point_id.as_deref().unwrap_or("-"),
            device.radio_link_id.as_deref().unwrap_or("-"),
            device.oob_ip_address.as_deref().unwrap_or("-"),
        );
    }
    println!();
    println!("Links per location");
    println!("------------------");
    for (node, links) in &topology.graph {
        println!("  {node}: {}", links.join(", "));
    }
    if !topology.nodes.unresolved.is_empty() || !topology.links.unresolved.is_empty() {
        println!();
        println!("Unresolved names");
        println!("----------------");
        for name in topology.nodes.unresolved.iter().chain(&topology.links.unresolved) {
            println!("  {name}");
        }
    }
    if !topology.devices.orphans.is_empty() {
        println!();
        println!("Orphans: {}", topology.devices.orphans.join(", "));
    }
    Ok(())
}

async fn handle_features(
    config: &Config,
    http: &Client,
    mut store: Datastore,
    cmd: FeaturesCommand,
) -> anyhow::Result<()> {
    match cmd {
        FeaturesCommand::List { subtype, json } => {
            let wanted: Option<Subtype> = subtype.map(Into::into);
            let features: Vec<_> = store
                .all()
                .filter(|f| wanted.is_none() || f.subtype() == wanted)
                .collect();
            if json {
                print!("{}", collection_string(features)?);
            } else {
                for feature in &features {
                    println!(
                        "{:<24} {:<12} {}",
                        feature.id(),
                        feature.subtype().map_or("-", Subtype::as_str),
                        feature.description().unwrap_or(""),
                    );
                }
                println!("{} features", features.len());
            }
        }
        FeaturesCommand::Export { to, path } => {
            let location = DataLocation::from(to);
            let mut config = config.clone();
            if let Some(path) = path {
                match location {
                    DataLocation::Folder => config.datastore.folder = path,
                    DataLocation::File => config.datastore.file = path,
                    DataLocation::Gist | DataLocation::None => {
                        warn!("--path is ignored when exporting to a gist");
                    }
                }
            }
            save(&store, location, &config, http).await?;
        }
        FeaturesCommand::Clean => {
            let removed: usize = store
                .features_mut()
                .map(|f| f.remove_unused_properties().len())
                .sum();
            println!("Removed {removed} empty properties");
            save(&store, config.datastore.save, config, http).await?;
        }
        FeaturesCommand::Altitude { offset } => {
            let elevation = ElevationClient::new(http.clone(), &config.elevation);
            let summary = store.infer_altitudes(&elevation, offset).await;
            println!(
                "Updated altitude of {} points, {} failed",
                summary.updated, summary.failed
            );
            save(&store, config.datastore.save, config, http).await?;
        }
    }
    Ok(())
}

async fn save(
    store: &Datastore,
    location: DataLocation,
    config: &Config,
    http: &Client,
) -> anyhow::Result<()> {
    match store
        .save_location(location, config, http)
        .await
        .context("failed to save features")?
    {
        Some(target) => println!("Saved {} features to {target}", store.len()),
        None => println!("Saving is disabled (datastore.save = \"none\")"),
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Install]");
                println!("  Source:             {:?}", config.install.source);
                println!(
                    "  Quip thread:        {}",
                    config.quip.thread_id.as_deref().unwrap_or("(not set)")
                );
                println!();
                println!("[Datastore]");
                println!("  Load from:          {:?}", config.datastore.load);
                println!("  Save to:            {:?}", config.datastore.save);
                println!("  Folder:             {}", config.datastore.folder.display());
                println!("  File:               {}", config.datastore.file.display());
                println!();
                println!("[Probe]");
                println!("  Ping command:       {}", config.probe.ping_command.join(" "));
                println!("  Timeout (ms):       {}", config.probe.timeout_ms);
                println!("  Concurrency:        {}", config.probe.concurrency);
                println!();
                println!("[Map]");
                println!("  Output:             {}", config.map.output_path.display());
                println!(
                    "  Centre:             {}, {} (zoom {})",
                    config.map.center_lat, config.map.center_lng, config.map.zoom
                );
                println!("  Watch interval (s): {}", config.watch.interval_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(config_path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_invalid_config_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[watch]\ninterval_secs = 0\n").unwrap();

        let result = handle_config(None, ConfigCommand::Validate { file: Some(path) });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[map]\nzoom = 15\n").unwrap();

        assert!(handle_config(None, ConfigCommand::Validate { file: Some(path) }).is_ok());
    }
}
