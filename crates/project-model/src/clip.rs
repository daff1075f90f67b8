//! Media clips placed on the timeline.
//!
//! A clip selects a window `[source_in, source_out)` of an asset and places
//! it at `[timeline_start, timeline_end)` on the timeline. The playback
//! speed is never stored: it is the ratio of the two spans, and every
//! operation in [`crate::ops`] preserves it.

use serde::{Deserialize, Serialize};

use crate::asset::AssetRef;
use crate::timeline::ElementId;

/// Minimum trimmed source span in seconds.
pub const MIN_CLIP_LENGTH: f64 = 0.1;

/// Default source length for assets whose duration is unknown.
pub const DEFAULT_MEDIA_DURATION: f64 = 30.0;

/// Kind of media a clip plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    /// Whether the clip contributes to the video composite.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Video | Self::Image)
    }

    /// Whether the clip can carry an audio stream.
    pub fn can_carry_audio(self) -> bool {
        matches!(self, Self::Video | Self::Audio)
    }
}

/// Sub-rectangle of the decoded frame, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A media clip on the timeline.
///
/// Invariants held after every successful operation:
/// - `0 <= source_in`, `source_out - source_in >= MIN_CLIP_LENGTH`
/// - `source_out <= source_duration` (unbounded for images)
/// - `0 <= timeline_start < timeline_end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaClip {
    pub id: ElementId,
    pub asset_ref: AssetRef,
    pub media_kind: MediaKind,
    pub file_name: String,

    pub source_in: f64,
    pub source_out: f64,
    pub source_duration: f64,

    pub timeline_start: f64,
    pub timeline_end: f64,

    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation_deg: f64,
    pub opacity_percent: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub crop_rect: Option<CropRect>,

    pub volume_percent: f64,
}

impl MediaClip {
    /// Create a clip spanning the whole asset, placed at `timeline_start`
    /// with full-canvas geometry.
    pub fn new(
        asset_ref: AssetRef,
        media_kind: MediaKind,
        file_name: impl Into<String>,
        source_duration: Option<f64>,
        timeline_start: f64,
    ) -> Self {
        let duration = source_duration
            .filter(|d| d.is_finite() && *d >= MIN_CLIP_LENGTH)
            .unwrap_or(DEFAULT_MEDIA_DURATION);
        let start = if timeline_start.is_finite() {
            timeline_start.max(0.0)
        } else {
            0.0
        };
        Self {
            id: ElementId::new(),
            asset_ref,
            media_kind,
            file_name: file_name.into(),
            source_in: 0.0,
            source_out: duration,
            source_duration: duration,
            timeline_start: start,
            timeline_end: start + duration,
            x: 0.0,
            y: 0.0,
            width: 1920.0,
            height: 1080.0,
            rotation_deg: 0.0,
            opacity_percent: 100.0,
            z_index: 0,
            crop_rect: None,
            volume_percent: 100.0,
        }
    }

    /// Length of the trimmed source window.
    pub fn source_span(&self) -> f64 {
        self.source_out - self.source_in
    }

    /// Length of the clip on the timeline.
    pub fn timeline_span(&self) -> f64 {
        self.timeline_end - self.timeline_start
    }

    /// Playback speed: source seconds consumed per timeline second.
    pub fn speed_factor(&self) -> f64 {
        let span = self.timeline_span();
        if span > 0.0 {
            self.source_span() / span
        } else {
            1.0
        }
    }

    /// Upper bound for `source_out`. Still images have no intrinsic length.
    pub fn source_limit(&self) -> f64 {
        match self.media_kind {
            MediaKind::Image => f64::INFINITY,
            MediaKind::Video | MediaKind::Audio => self.source_duration,
        }
    }
}
