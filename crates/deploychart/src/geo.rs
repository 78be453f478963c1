//! Small geodesy helpers and the elevation lookup client.
//!
//! Positions follow GeoJSON axis order: `[longitude, latitude(, altitude)]`.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ElevationConfig;
use crate::error::{Error, Result};

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const ELEVATION_SERVICE: &str = "elevation";

/// Round `value` to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

fn lng_lat(position: &[f64]) -> (f64, f64) {
    (
        position.first().copied().unwrap_or_default(),
        position.get(1).copied().unwrap_or_default(),
    )
}

/// Great-circle distance between two positions in metres, rounded to 0.1 m.
///
/// Altitude is ignored; survey altitudes are rarely accurate enough to help.
#[must_use]
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    let (lng1, lat1) = lng_lat(a);
    let (lng2, lat2) = lng_lat(b);
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    round_to(EARTH_RADIUS_M * c, 1)
}

/// Initial true bearing and elevation angle from `origin` to `destination`,
/// both in degrees.
///
/// The bearing is in `[0, 360)`. The elevation angle uses the altitude of
/// both positions when both carry one, and is 0 otherwise.
#[must_use]
pub fn azimuth_elevation(origin: &[f64], destination: &[f64]) -> (f64, f64) {
    let (lng1, lat1) = lng_lat(origin);
    let (lng2, lat2) = lng_lat(destination);
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dlng = (lng2 - lng1).to_radians();

    let y = dlng.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlng.cos();
    let azimuth = (y.atan2(x).to_degrees() + 360.0) % 360.0;

    let elevation = match (origin.get(2), destination.get(2)) {
        (Some(alt1), Some(alt2)) => (alt2 - alt1).atan2(distance(origin, destination)).to_degrees(),
        _ => 0.0,
    };

    (azimuth, elevation)
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<ElevationResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ElevationResult {
    elevation: f64,
}

/// Client for a Google-Elevation-compatible API.
#[derive(Debug, Clone)]
pub struct ElevationClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    request_delay: Duration,
}

impl ElevationClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(http: Client, config: &ElevationConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    fn request_url(&self, latitude: f64, longitude: f64) -> Result<Url> {
        let locations = format!("{latitude},{longitude}");
        let mut params = vec![("locations", locations)];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| Error::api(ELEVATION_SERVICE, format!("bad base URL: {e}")))
    }

    /// Ground elevation at a position plus `offset` metres, rounded to 0.1 m.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service reports no result.
    pub async fn altitude(&self, latitude: f64, longitude: f64, offset: f64) -> Result<f64> {
        let url = self.request_url(latitude, longitude)?;
        debug!("Requesting elevation for {latitude},{longitude}");
        let response = self.http.get(url).send().await?;
        response.error_for_status_ref()?;
        let body: ElevationResponse = response.json().await?;
        let elevation = parse_elevation(body)?;
        info!("At {latitude},{longitude}, the altitude is {elevation}");

        // Stay under the service's request rate
        tokio::time::sleep(self.request_delay).await;

        Ok(round_to(offset + elevation, 1))
    }
}

fn parse_elevation(body: ElevationResponse) -> Result<f64> {
    if !body.status.is_empty() && body.status != "OK" {
        let detail = body.error_message.unwrap_or_default();
        return Err(Error::api(
            ELEVATION_SERVICE,
            format!("status {} {detail}", body.status).trim_end().to_string(),
        ));
    }
    body.results
        .first()
        .map(|result| result.elevation)
        .ok_or_else(|| Error::api(ELEVATION_SERVICE, "no results returned"))
}
