//! The timeline aggregate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clip::MediaClip;
use crate::text::TextOverlay;

/// Stable identity of a clip or text overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(uuid::Uuid);

impl ElementId {
    /// Generate a fresh identity.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// First eight hex digits, for logs and listings.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ElementId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Output canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// The editing timeline (`timeline.json`).
///
/// Storage order of `clips` and `overlays` only matters for insert
/// positions and for breaking ties between equal z-indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Schema version.
    pub version: String,

    /// Fixed project frame rate.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Fixed output canvas.
    #[serde(default)]
    pub canvas: Canvas,

    #[serde(default)]
    pub clips: Vec<MediaClip>,

    #[serde(default)]
    pub overlays: Vec<TextOverlay>,
}

fn default_frame_rate() -> u32 {
    30
}

/// A borrowed element of either kind.
#[derive(Debug, Clone, Copy)]
pub enum ElementRef<'a> {
    Clip(&'a MediaClip),
    Text(&'a TextOverlay),
}

impl ElementRef<'_> {
    /// Timeline placement `(start, end)`.
    pub fn span(&self) -> (f64, f64) {
        match self {
            Self::Clip(c) => (c.timeline_start, c.timeline_end),
            Self::Text(t) => (t.timeline_start, t.timeline_end),
        }
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            version: "1.0".to_string(),
            frame_rate: default_frame_rate(),
            canvas: Canvas::default(),
            clips: vec![],
            overlays: vec![],
        }
    }

    /// Whether the timeline has neither clips nor overlays.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty() && self.overlays.is_empty()
    }

    /// Latest `timeline_end` across all elements, with a one-second floor.
    pub fn total_duration(&self) -> f64 {
        self.clips
            .iter()
            .map(|c| c.timeline_end)
            .chain(self.overlays.iter().map(|t| t.timeline_end))
            .filter(|end| end.is_finite())
            .fold(1.0, f64::max)
    }

    pub fn clip(&self, id: ElementId) -> Option<&MediaClip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn overlay(&self, id: ElementId) -> Option<&TextOverlay> {
        self.overlays.iter().find(|t| t.id == id)
    }

    /// Look up an element of either kind.
    pub fn element(&self, id: ElementId) -> Option<ElementRef<'_>> {
        self.clip(id)
            .map(ElementRef::Clip)
            .or_else(|| self.overlay(id).map(ElementRef::Text))
    }

    pub(crate) fn clip_index(&self, id: ElementId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    pub(crate) fn overlay_index(&self, id: ElementId) -> Option<usize> {
        self.overlays.iter().position(|t| t.id == id)
    }

    /// Find an element by full id or by a unique id prefix.
    pub fn resolve_id(&self, needle: &str) -> Option<ElementId> {
        if let Ok(id) = needle.parse::<ElementId>() {
            return self.element(id).map(|_| id);
        }
        let needle = needle.to_ascii_lowercase();
        let mut matches = self
            .clips
            .iter()
            .map(|c| c.id)
            .chain(self.overlays.iter().map(|t| t.id))
            .filter(|id| id.to_string().starts_with(&needle));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first)
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}
