//! HTML map rendering.
//!
//! Produces a single self-contained page drawing every feature with Leaflet,
//! coloured by its overall status, with a popup listing its properties.

use std::path::Path;

use chrono::Utc;
use geojson::Value;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::config::MapConfig;
use crate::error::{Error, Result};
use crate::feature::DeploymentFeature;
use crate::status::Status;

const LEAFLET_VERSION: &str = "1.9.4";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>@TITLE@</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@@LEAFLET@/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@@LEAFLET@/dist/leaflet.js"></script>
<style>
html, body { height: 100%; margin: 0; }
#map { height: 100%; }
.generated { position: absolute; bottom: 20px; left: 10px; z-index: 1000;
  background: rgba(255, 255, 255, 0.8); padding: 2px 6px; font: 12px sans-serif; }
.popup table { border-collapse: collapse; }
.popup th, .popup td { border-bottom: 1px solid #ddd; padding: 2px 6px;
  text-align: left; vertical-align: top; }
</style>
</head>
<body>
<div id="map"></div>
<div class="generated">@TITLE@ &middot; generated @GENERATED@</div>
<script>
const map = L.map('map').setView([@LAT@, @LNG@], @ZOOM@);
L.tileLayer(@TILE_URL@, { maxZoom: 22, attribution: @ATTRIBUTION@ }).addTo(map);
const layers = @LAYERS@;
for (const layer of layers) {
  let shape;
  if (layer.kind === 'polyline') {
    shape = L.polyline(layer.coordinates, { color: layer.color, weight: 4 });
  } else if (layer.kind === 'polygon') {
    shape = L.polygon(layer.coordinates, { color: layer.color, fillColor: layer.color, fillOpacity: 0.4 });
  } else {
    shape = L.circleMarker(layer.coordinates, {
      radius: 8, color: '#000000', weight: 1, fillColor: layer.color, fillOpacity: 1
    });
  }
  shape.bindPopup(layer.popup, { maxWidth: @POPUP_WIDTH@ }).addTo(map);
}
</script>
</body>
</html>
"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum LayerKind {
    Polyline,
    Polygon,
    Marker,
}

#[derive(Debug, Serialize)]
struct Layer {
    id: String,
    kind: LayerKind,
    coordinates: JsonValue,
    color: &'static str,
    popup: String,
}

/// Renders features onto an HTML map.
#[derive(Debug, Clone)]
pub struct MapRenderer {
    config: MapConfig,
}

impl MapRenderer {
    /// Create a renderer with the given map settings.
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        Self { config }
    }

    /// Render the page.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer data cannot be serialized.
    pub fn render(&self, features: &[DeploymentFeature]) -> Result<String> {
        let layers: Vec<Layer> = features.iter().filter_map(|f| self.layer(f)).collect();
        debug!("Rendering {} of {} features", layers.len(), features.len());

        let page = PAGE_TEMPLATE
            .replace("@LEAFLET@", LEAFLET_VERSION)
            .replace("@TITLE@", &escape_html(&self.config.title))
            .replace("@GENERATED@", &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .replace("@LAT@", &self.config.center_lat.to_string())
            .replace("@LNG@", &self.config.center_lng.to_string())
            .replace("@ZOOM@", &self.config.zoom.to_string())
            .replace("@TILE_URL@", &script_json(&self.config.tile_url)?)
            .replace("@ATTRIBUTION@", &script_json(&self.config.attribution)?)
            .replace("@POPUP_WIDTH@", &self.config.popup_width.to_string())
            .replace("@LAYERS@", &script_json(&layers)?);
        Ok(page)
    }

    /// Render the page to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be rendered or written.
    pub fn write(&self, path: &Path, features: &[DeploymentFeature]) -> Result<()> {
        let page = self.render(features)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, page).map_err(|e| Error::file_access(path, e))?;
        info!("Wrote map of {} features to {}", features.len(), path.display());
        Ok(())
    }

    fn layer(&self, feature: &DeploymentFeature) -> Option<Layer> {
        let (kind, coordinates) = match &feature.geometry().value {
            Value::Point(position) => (LayerKind::Marker, JsonValue::from(lat_lng(position))),
            Value::LineString(line) => (LayerKind::Polyline, lat_lng_line(line)),
            Value::Polygon(rings) => (
                LayerKind::Polygon,
                JsonValue::Array(rings.iter().map(|ring| lat_lng_line(ring)).collect()),
            ),
            _ => {
                debug!("Skipping {}: only points, lines and polygons are drawn", feature.id());
                return None;
            }
        };
        let status = feature.overall_status().unwrap_or(Status::Unknown);
        Some(Layer {
            id: feature.id().to_string(),
            kind,
            coordinates,
            color: status.color().hex(),
            popup: self.popup(feature),
        })
    }

    fn popup(&self, feature: &DeploymentFeature) -> String {
        let title = feature.description().unwrap_or(feature.id());
        let rows: String = feature
            .properties()
            .iter()
            .map(|(name, value)| {
                let text = match value {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!(
                    "<tr><th>{}</th><td>{}</td></tr>",
                    escape_html(name),
                    escape_html(&text).replace('\n', "<br>")
                )
            })
            .collect();
        format!(
            "<div class=\"popup\" style=\"width:{}px;height:{}px;overflow:auto\">\
             <h2>{}</h2><table>{rows}</table></div>",
            self.config.popup_width,
            self.config.popup_height,
            escape_html(title)
        )
    }
}

fn lat_lng(position: &[f64]) -> Vec<f64> {
    match position {
        [lng, lat, ..] => vec![*lat, *lng],
        _ => Vec::new(),
    }
}

fn lat_lng_line(line: &[Vec<f64>]) -> JsonValue {
    JsonValue::Array(line.iter().map(|p| JsonValue::from(lat_lng(p))).collect())
}

/// Serialize for embedding inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
