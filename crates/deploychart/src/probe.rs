//! Device health probes.
//!
//! Each probe answers one question about one device. Probes run
//! concurrently across devices with a configurable limit.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;
use crate::device::SectorDevice;
use crate::status::Status;

/// Kind of device probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeKind {
    /// ICMP reachability of the management address.
    Ping,
    /// Management login port reachability.
    Login,
    /// Radio link health.
    RadioLink,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping => write!(f, "ping"),
            Self::Login => write!(f, "login"),
            Self::RadioLink => write!(f, "radio-link"),
        }
    }
}

/// A check run against a single device.
#[async_trait]
pub trait Probe: Send + Sync + fmt::Debug {
    /// Which status this probe produces.
    fn kind(&self) -> ProbeKind;

    /// Probe the device. Never fails: problems running the probe itself
    /// come back as [`Status::Unknown`].
    async fn check(&self, device: &SectorDevice) -> Status;
}

fn management_address(device: &SectorDevice) -> Option<&str> {
    device
        .oob_ip_address
        .as_deref()
        .map(str::trim)
        .filter(|address| !address.is_empty())
}

/// Pings the management address with an external command.
#[derive(Debug, Clone)]
pub struct PingProbe {
    command: Vec<String>,
    timeout: Duration,
}

impl PingProbe {
    /// Create a probe running `command` with the address appended.
    #[must_use]
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl Probe for PingProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Ping
    }

    async fn check(&self, device: &SectorDevice) -> Status {
        let Some(address) = management_address(device) else {
            return Status::Unknown;
        };
        let Some((program, args)) = self.command.split_first() else {
            return Status::Unknown;
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .arg(address)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.status()).await {
            Ok(Ok(status)) if status.success() => Status::Up,
            Ok(Ok(status)) => {
                debug!("ping {address} for {} exited with {status}", device.id);
                Status::Down
            }
            Ok(Err(e)) => {
                warn!("Could not run {program}: {e}");
                Status::Unknown
            }
            Err(_) => {
                debug!("ping {address} for {} timed out", device.id);
                Status::Down
            }
        }
    }
}

/// Checks that the management login port accepts TCP connections.
#[derive(Debug, Clone)]
pub struct LoginProbe {
    port: u16,
    timeout: Duration,
}

impl LoginProbe {
    /// Create a probe connecting to `port`.
    #[must_use]
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

#[async_trait]
impl Probe for LoginProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Login
    }

    async fn check(&self, device: &SectorDevice) -> Status {
        let Some(address) = management_address(device) else {
            return Status::Unknown;
        };
        let Ok(ip) = address.parse::<IpAddr>() else {
            warn!("{} has an unusable management address '{address}'", device.id);
            return Status::Unknown;
        };

        let target = SocketAddr::new(ip, self.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_)) => Status::Up,
            Ok(Err(e)) => {
                debug!("login port {target} for {} refused: {e}", device.id);
                Status::Down
            }
            Err(_) => Status::Down,
        }
    }
}

/// The probes run against every device.
#[derive(Debug)]
pub struct ProbeSet {
    ping: Box<dyn Probe>,
    login: Box<dyn Probe>,
}

impl ProbeSet {
    /// Combine a ping and a login probe.
    #[must_use]
    pub fn new(ping: Box<dyn Probe>, login: Box<dyn Probe>) -> Self {
        Self { ping, login }
    }

    /// Probes as configured.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.probe_timeout();
        Self::new(
            Box::new(PingProbe::new(config.probe.ping_command.clone(), timeout)),
            Box::new(LoginProbe::new(config.probe.login_port, timeout)),
        )
    }
}

/// Run ping and login probes for every device, at most `concurrency`
/// devices at a time, then derive radio link status.
pub async fn probe_devices(devices: &mut [SectorDevice], probes: &ProbeSet, concurrency: usize) {
    let checks = devices.iter_mut().map(|device| async move {
        device.status_ping = probes.ping.check(device).await;
        device.status_login = probes.login.check(device).await;
        debug!(
            "{}: {} {}, {} {}",
            device.id,
            probes.ping.kind(),
            device.status_ping,
            probes.login.kind(),
            device.status_login
        );
    });
    let _: Vec<()> = futures::stream::iter(checks)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    assess_radio_links(devices);
}

/// Derive each device's radio status from the ping results of every device
/// on the same link.
pub fn assess_radio_links(devices: &mut [SectorDevice]) {
    let mut by_link: BTreeMap<String, Vec<Status>> = BTreeMap::new();
    for device in devices.iter() {
        if let Some(link) = &device.radio_link_id {
            by_link
                .entry(link.clone())
                .or_default()
                .push(device.status_ping);
        }
    }

    for device in devices.iter_mut() {
        device.status_radio_link = device
            .radio_link_id
            .as_ref()
            .and_then(|link| by_link.get(link))
            .map_or(Status::Unknown, |peers| roll_up(peers));
        debug!(
            "{}: {} {}",
            device.id,
            ProbeKind::RadioLink,
            device.status_radio_link
        );
    }
}

/// Combine individual results: all up, all down, some up, or unknown.
#[must_use]
pub fn roll_up(statuses: &[Status]) -> Status {
    if statuses.is_empty() {
        Status::Unknown
    } else if statuses.iter().all(|s| *s == Status::Down) {
        Status::Down
    } else if statuses.iter().all(|s| *s == Status::Up) {
        Status::Up
    } else if statuses.contains(&Status::Up) {
        Status::PartialUp
    } else {
        Status::Unknown
    }
}
