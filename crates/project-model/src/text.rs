//! Text overlays drawn on top of the composited clips.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::timeline::ElementId;

/// Default on-screen duration for a new text overlay.
pub const DEFAULT_TEXT_DURATION: f64 = 10.0;

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorRgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ColorRgba {
    pub const WHITE: ColorRgba = ColorRgba::rgb(255, 255, 255);
    pub const BLACK: ColorRgba = ColorRgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn alpha(&self) -> f64 {
        f64::from(self.a) / 255.0
    }

    /// `0xRRGGBB` without alpha.
    pub fn hex_rgb(&self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for ColorRgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Error parsing a color string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}', expected #rrggbb or #rrggbbaa")]
pub struct ParseColorError(String);

impl FromStr for ColorRgba {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().trim_start_matches('#');
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Self {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a,
        })
    }
}

impl Serialize for ColorRgba {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ColorRgba {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A text overlay on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub id: ElementId,
    pub text: String,
    pub timeline_start: f64,
    pub timeline_end: f64,
    pub x: f64,
    pub y: f64,
    pub font_family: String,
    pub font_size_px: f64,
    pub color: ColorRgba,
    pub opacity_percent: f64,
    #[serde(default)]
    pub z_index: i32,
}

impl TextOverlay {
    /// Create an overlay with the editor's default style (Arial 24px white).
    pub fn new(text: impl Into<String>, timeline_start: f64) -> Self {
        let start = if timeline_start.is_finite() {
            timeline_start.max(0.0)
        } else {
            0.0
        };
        Self {
            id: ElementId::new(),
            text: text.into(),
            timeline_start: start,
            timeline_end: start + DEFAULT_TEXT_DURATION,
            x: 600.0,
            y: 500.0,
            font_family: "Arial".to_string(),
            font_size_px: 24.0,
            color: ColorRgba::WHITE,
            opacity_percent: 100.0,
            z_index: 0,
        }
    }

    pub fn timeline_span(&self) -> f64 {
        self.timeline_end - self.timeline_start
    }
}
