//! Shared HTTP client.

use reqwest::Client;

use crate::config::Config;
use crate::error::Result;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("deploychart/", env!("CARGO_PKG_VERSION"));

/// Build the client used for Quip, GitHub and the elevation service.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_client(config: &Config) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.http_timeout())
        .build()?;
    Ok(client)
}
