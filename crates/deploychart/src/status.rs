//! Device and feature status values and their map colours.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Health of a device, a probe result, or the roll-up for a map feature.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Nothing answered.
    Down,
    /// Everything answered.
    Up,
    /// Some devices answered.
    PartialUp,
    /// Not probed, or the probe could not run.
    #[default]
    Unknown,
    /// Under test; left alone by status roll-up.
    Testing,
}

impl Status {
    /// All statuses in status-code order.
    pub const ALL: [Status; 5] = [
        Self::Down,
        Self::Up,
        Self::PartialUp,
        Self::Unknown,
        Self::Testing,
    ];

    /// Text form used in feature properties.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::PartialUp => "partial-up",
            Self::Unknown => "unknown",
            Self::Testing => "testing",
        }
    }

    /// Colour used to draw this status.
    #[must_use]
    pub fn color(self) -> MarkerColor {
        match self {
            Self::Down => MarkerColor::Red,
            Self::Up => MarkerColor::Green,
            Self::PartialUp => MarkerColor::Yellow,
            Self::Unknown => MarkerColor::White,
            Self::Testing => MarkerColor::Black,
        }
    }

    /// Numeric status code.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::PartialUp => 2,
            Self::Unknown => 3,
            Self::Testing => 4,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| Error::internal(format!("unknown status '{s}'")))
    }
}

/// Named colours understood by both Leaflet and the GitHub GeoJSON viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    /// `#ff2600`
    Red,
    /// `#00f900`
    Green,
    /// `#fffb00`
    Yellow,
    /// `#ffffff`
    White,
    /// `#000000`
    Black,
}

impl MarkerColor {
    /// Colour name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::White => "white",
            Self::Black => "black",
        }
    }

    /// Hex colour value.
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            Self::Red => "#ff2600",
            Self::Green => "#00f900",
            Self::Yellow => "#fffb00",
            Self::White => "#ffffff",
            Self::Black => "#000000",
        }
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Marker and stroke size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSize {
    /// Stroke width 1.
    #[default]
    Small,
    /// Stroke width 3.
    Medium,
    /// Stroke width 5.
    Large,
}

impl MarkerSize {
    /// Size name as used by `marker-size`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    /// Line width for `stroke-width`.
    #[must_use]
    pub fn stroke_width(self) -> u8 {
        match self {
            Self::Small => 1,
            Self::Medium => 3,
            Self::Large => 5,
        }
    }
}
