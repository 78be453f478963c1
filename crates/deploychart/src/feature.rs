//! Deployment features: the GeoJSON objects a deployment is charted from.
//!
//! Sites are physical objects in the cityscape (streetlamps, buildings,
//! traffic lights). A mountpoint is a roughly one metre cube on a site where
//! hardware is mounted. Observations record a characteristic of an object,
//! or of the path between two objects, whoever or whatever made them.
//! Devices and links are the installed hardware and the radio paths between
//! them.

use std::fmt;
use std::str::FromStr;

use geojson::{Geometry, JsonObject, JsonValue, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::{self, ElevationClient};
use crate::status::{MarkerColor, MarkerSize, Status};

/// Property holding the feature subtype.
pub const SUBTYPE_PROPERTY: &str = "subtype";

/// Property holding the human readable location name.
pub const DESCRIPTION_PROPERTY: &str = "desc";

/// Property holding the rolled-up status.
pub const OVERALL_STATUS_PROPERTY: &str = "Overall Status";

/// Kind of deployment feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    /// A physical object such as a streetlamp or building.
    Site,
    /// A mounting location on a site.
    Mountpoint,
    /// An observation of an object or between two objects.
    Observation,
    /// Installed hardware.
    Device,
    /// A radio path.
    Link,
}

impl Subtype {
    /// All subtypes.
    pub const ALL: [Subtype; 5] = [
        Self::Site,
        Self::Mountpoint,
        Self::Observation,
        Self::Device,
        Self::Link,
    ];

    /// Name as stored in the `subtype` property.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Mountpoint => "mountpoint",
            Self::Observation => "observation",
            Self::Device => "device",
            Self::Link => "link",
        }
    }

    /// Folder holding features of this subtype in a folder datastore.
    #[must_use]
    pub fn folder_name(self) -> &'static str {
        match self {
            Self::Site => "site-objects",
            Self::Mountpoint => "mountpoint-objects",
            Self::Observation => "observation-objects",
            Self::Device => "device-objects",
            Self::Link => "link-objects",
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subtype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|subtype| subtype.as_str() == wanted)
            .ok_or_else(|| Error::internal(format!("unknown subtype '{s}'")))
    }
}

/// A single-geometry WGS84 feature used to track a deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentFeature {
    id: String,
    geometry: Geometry,
    properties: JsonObject,
}

impl DeploymentFeature {
    /// Create a feature, normalising coordinate precision.
    #[must_use]
    pub fn new(id: impl Into<String>, geometry: Geometry, properties: JsonObject) -> Self {
        let mut feature = Self {
            id: id.into(),
            geometry,
            properties,
        };
        feature.normalize_precision();
        feature
    }

    /// Feature identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Feature geometry.
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Feature properties.
    #[must_use]
    pub fn properties(&self) -> &JsonObject {
        &self.properties
    }

    /// Mutable feature properties.
    pub fn properties_mut(&mut self) -> &mut JsonObject {
        &mut self.properties
    }

    /// Single property as a string slice, if it is a string.
    #[must_use]
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(JsonValue::as_str)
    }

    /// The feature's subtype, if set and recognised.
    #[must_use]
    pub fn subtype(&self) -> Option<Subtype> {
        self.property_str(SUBTYPE_PROPERTY)
            .and_then(|s| s.parse().ok())
    }

    /// Set the feature's subtype.
    pub fn set_subtype(&mut self, subtype: Subtype) {
        self.properties.insert(
            SUBTYPE_PROPERTY.to_string(),
            JsonValue::from(subtype.as_str()),
        );
    }

    /// Human readable location name (the `desc` property).
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.property_str(DESCRIPTION_PROPERTY)
    }

    /// Rolled-up status, if one has been assigned.
    #[must_use]
    pub fn overall_status(&self) -> Option<Status> {
        self.property_str(OVERALL_STATUS_PROPERTY)
            .and_then(|s| s.parse().ok())
    }

    /// Length of a LineString in metres; 0 for every other geometry.
    #[must_use]
    pub fn length(&self) -> f64 {
        match &self.geometry.value {
            Value::LineString(line) => line
                .windows(2)
                .map(|pair| geo::distance(&pair[0], &pair[1]))
                .sum(),
            _ => 0.0,
        }
    }

    /// Trim coordinates to roughly 10 cm: 6 decimals for x/y, 1 for z.
    pub fn normalize_precision(&mut self) {
        match &mut self.geometry.value {
            Value::Point(position) => normalize_position(position),
            Value::MultiPoint(positions) | Value::LineString(positions) => {
                positions.iter_mut().for_each(normalize_position);
            }
            Value::Polygon(rings) | Value::MultiLineString(rings) => rings
                .iter_mut()
                .flatten()
                .for_each(normalize_position),
            _ => debug!("precision left as-is for feature {}", self.id),
        }
    }

    /// Drop properties whose value is the empty string.
    ///
    /// Returns the names of the removed properties.
    pub fn remove_unused_properties(&mut self) -> Vec<String> {
        let unused: Vec<String> = self
            .properties
            .iter()
            .filter(|(_, value)| value.as_str() == Some(""))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &unused {
            debug!("{name} => deleted for ({})", self.id);
            self.properties.remove(name);
        }
        unused
    }

    /// Merge `properties` in, overwriting existing values.
    pub fn update_properties(&mut self, properties: JsonObject) {
        self.properties.extend(properties);
    }

    /// Set simplestyle display properties for points and lines.
    pub fn update_icon(&mut self, color: MarkerColor, size: MarkerSize) {
        let mut style = JsonObject::new();
        match self.geometry.value {
            Value::Point(_) => {
                style.insert("marker-color".to_string(), color.hex().into());
                style.insert("marker-size".to_string(), size.name().into());
            }
            Value::LineString(_) => {
                style.insert("stroke".to_string(), color.name().into());
                style.insert("stroke-width".to_string(), size.stroke_width().into());
                style.insert("stroke-opacity".to_string(), 1.into());
            }
            _ => return,
        }
        self.update_properties(style);
    }

    /// Replace a point's altitude with ground elevation plus `height_offset`.
    ///
    /// Returns `false` for non-point geometries, which are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the elevation lookup fails.
    pub async fn infer_altitude(
        &mut self,
        elevation: &ElevationClient,
        height_offset: f64,
    ) -> Result<bool> {
        let Value::Point(position) = &self.geometry.value else {
            return Ok(false);
        };
        let (lng, lat) = match position.as_slice() {
            [lng, lat, ..] => (*lng, *lat),
            _ => {
                return Err(Error::invalid_feature(
                    self.id.clone(),
                    "point has fewer than two coordinates",
                ))
            }
        };
        let altitude = elevation.altitude(lat, lng, height_offset).await?;
        self.geometry.value = Value::Point(vec![lng, lat, altitude]);
        Ok(true)
    }

    /// Convert to a plain GeoJSON feature.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(self.geometry.clone()),
            id: Some(geojson::feature::Id::String(self.id.clone())),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }
}

fn normalize_position(position: &mut Vec<f64>) {
    for (axis, value) in position.iter_mut().enumerate().take(3) {
        let decimals = if axis < 2 { 6 } else { 1 };
        *value = geo::round_to(*value, decimals);
    }
}
