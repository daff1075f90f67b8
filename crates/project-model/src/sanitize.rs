//! Sanitization of persisted timeline state.
//!
//! Saved timelines may come from older builds or hand edits: numbers can be
//! missing, `null`, strings, or out of range. Loading goes through lenient
//! record types whose numeric fields fall back to fixed defaults, then every
//! clip is repaired so the clip invariants hold.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::asset::AssetRef;
use crate::clip::{CropRect, MediaClip, MediaKind, DEFAULT_MEDIA_DURATION, MIN_CLIP_LENGTH};
use crate::text::{ColorRgba, TextOverlay, DEFAULT_TEXT_DURATION};
use crate::timeline::{Canvas, ElementId, Timeline};

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
    .filter(|n| n.is_finite()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTimeline {
    version: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    frame_rate: Option<f64>,
    canvas: Option<Canvas>,
    clips: Vec<RawClip>,
    overlays: Vec<RawOverlay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCrop {
    #[serde(deserialize_with = "lenient_number")]
    x: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    y: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    width: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    height: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawClip {
    id: Option<String>,
    asset_ref: Option<String>,
    media_kind: Option<MediaKind>,
    file_name: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    source_in: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    source_out: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    source_duration: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    timeline_start: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    timeline_end: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    x: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    y: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    width: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    height: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    rotation_deg: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    opacity_percent: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    z_index: Option<f64>,
    crop_rect: Option<RawCrop>,
    #[serde(deserialize_with = "lenient_number")]
    volume_percent: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOverlay {
    id: Option<String>,
    text: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    timeline_start: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    timeline_end: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    x: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    y: Option<f64>,
    font_family: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    font_size_px: Option<f64>,
    color: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    opacity_percent: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    z_index: Option<f64>,
}

fn parse_id(raw: Option<String>) -> ElementId {
    raw.and_then(|s| s.parse().ok()).unwrap_or_else(ElementId::new)
}

fn z_from(raw: Option<f64>) -> i32 {
    raw.map(|z| z.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
        .unwrap_or(0)
}

impl RawClip {
    fn into_clip(self) -> MediaClip {
        let source_duration = self
            .source_duration
            .filter(|d| *d > 0.0)
            .unwrap_or(DEFAULT_MEDIA_DURATION);
        let source_in = self.source_in.unwrap_or(0.0);
        let source_out = self.source_out.unwrap_or(source_duration);
        let timeline_start = self.timeline_start.unwrap_or(0.0);
        let timeline_end = self
            .timeline_end
            .unwrap_or(timeline_start + (source_out - source_in));
        let width = self.width.unwrap_or(1920.0);
        let height = self.height.unwrap_or(1080.0);
        let crop_rect = self.crop_rect.map(|c| CropRect {
            x: c.x.unwrap_or(0.0),
            y: c.y.unwrap_or(0.0),
            width: c.width.unwrap_or(width),
            height: c.height.unwrap_or(height),
        });

        let mut clip = MediaClip {
            id: parse_id(self.id),
            asset_ref: AssetRef::new(self.asset_ref.unwrap_or_default()),
            media_kind: self.media_kind.unwrap_or(MediaKind::Video),
            file_name: self.file_name.unwrap_or_default(),
            source_in,
            source_out,
            source_duration,
            timeline_start,
            timeline_end,
            x: self.x.unwrap_or(0.0),
            y: self.y.unwrap_or(0.0),
            width,
            height,
            rotation_deg: self.rotation_deg.unwrap_or(0.0),
            opacity_percent: self.opacity_percent.unwrap_or(100.0),
            z_index: z_from(self.z_index),
            crop_rect,
            volume_percent: self.volume_percent.unwrap_or(100.0),
        };
        repair_clip(&mut clip);
        clip
    }
}

impl RawOverlay {
    fn into_overlay(self) -> TextOverlay {
        let defaults = TextOverlay::new("", 0.0);
        let timeline_start = self.timeline_start.unwrap_or(0.0);
        let mut overlay = TextOverlay {
            id: parse_id(self.id),
            text: self.text.unwrap_or_default(),
            timeline_start,
            timeline_end: self
                .timeline_end
                .unwrap_or(timeline_start + DEFAULT_TEXT_DURATION),
            x: self.x.unwrap_or(defaults.x),
            y: self.y.unwrap_or(defaults.y),
            font_family: self
                .font_family
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(defaults.font_family),
            font_size_px: self.font_size_px.unwrap_or(defaults.font_size_px),
            color: self
                .color
                .and_then(|c| c.parse::<ColorRgba>().ok())
                .unwrap_or(defaults.color),
            opacity_percent: self.opacity_percent.unwrap_or(100.0),
            z_index: z_from(self.z_index),
        };
        repair_overlay(&mut overlay);
        overlay
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Restore the clip invariants, keeping as much of the stored state as possible.
///
/// The speed recorded by the stored spans is kept when it is sane; otherwise
/// the clip plays at normal speed.
pub fn repair_clip(clip: &mut MediaClip) {
    clip.source_duration = finite_or(clip.source_duration, DEFAULT_MEDIA_DURATION)
        .max(MIN_CLIP_LENGTH);
    clip.x = finite_or(clip.x, 0.0);
    clip.y = finite_or(clip.y, 0.0);
    clip.width = finite_or(clip.width, 1920.0).max(1.0);
    clip.height = finite_or(clip.height, 1080.0).max(1.0);
    clip.rotation_deg = finite_or(clip.rotation_deg, 0.0) % 360.0;
    clip.opacity_percent = finite_or(clip.opacity_percent, 100.0).clamp(0.0, 100.0);
    clip.volume_percent =
        finite_or(clip.volume_percent, 100.0).clamp(0.0, crate::ops::MAX_VOLUME_PERCENT);
    if let Some(crop) = clip.crop_rect {
        let valid = [crop.x, crop.y, crop.width, crop.height]
            .iter()
            .all(|v| v.is_finite())
            && crop.width >= 1.0
            && crop.height >= 1.0;
        if !valid {
            clip.crop_rect = None;
        }
    }

    let original_speed = {
        let tspan = clip.timeline_end - clip.timeline_start;
        let sspan = clip.source_out - clip.source_in;
        let speed = sspan / tspan;
        if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            1.0
        }
    };

    let limit = clip.source_limit();
    let source_in = finite_or(clip.source_in, 0.0).max(0.0);
    let source_in = if limit.is_finite() {
        source_in.min(limit - MIN_CLIP_LENGTH).max(0.0)
    } else {
        source_in
    };
    let source_out = finite_or(clip.source_out, source_in + DEFAULT_MEDIA_DURATION)
        .min(limit)
        .max(source_in + MIN_CLIP_LENGTH);
    clip.source_in = source_in;
    clip.source_out = source_out;

    clip.timeline_start = finite_or(clip.timeline_start, 0.0).max(0.0);
    clip.timeline_end = clip.timeline_start + (source_out - source_in) / original_speed;
}

/// Restore text overlay invariants.
pub fn repair_overlay(overlay: &mut TextOverlay) {
    overlay.x = finite_or(overlay.x, 0.0);
    overlay.y = finite_or(overlay.y, 0.0);
    overlay.font_size_px = finite_or(overlay.font_size_px, 24.0).max(1.0);
    overlay.opacity_percent = finite_or(overlay.opacity_percent, 100.0).clamp(0.0, 100.0);
    overlay.timeline_start = finite_or(overlay.timeline_start, 0.0).max(0.0);
    let end = finite_or(
        overlay.timeline_end,
        overlay.timeline_start + DEFAULT_TEXT_DURATION,
    );
    overlay.timeline_end = end.max(overlay.timeline_start + MIN_CLIP_LENGTH);
}

/// Repair every element of an in-memory timeline.
pub fn repair_timeline(timeline: &mut Timeline) {
    if timeline.frame_rate == 0 {
        timeline.frame_rate = 30;
    }
    if timeline.canvas.width == 0 || timeline.canvas.height == 0 {
        timeline.canvas = Canvas::default();
    }
    timeline.clips.iter_mut().for_each(repair_clip);
    timeline.overlays.iter_mut().for_each(repair_overlay);
}

/// Parse a persisted timeline, substituting fallbacks for malformed values.
pub fn timeline_from_json(json: &str) -> Result<Timeline, serde_json::Error> {
    let raw: RawTimeline = serde_json::from_str(json)?;
    let frame_rate = raw
        .frame_rate
        .filter(|f| *f >= 1.0 && *f <= 240.0)
        .map(|f| f.round() as u32)
        .unwrap_or(30);
    let mut timeline = Timeline {
        version: raw.version.unwrap_or_else(|| "1.0".to_string()),
        frame_rate,
        canvas: raw.canvas.unwrap_or_default(),
        clips: raw.clips.into_iter().map(RawClip::into_clip).collect(),
        overlays: raw.overlays.into_iter().map(RawOverlay::into_overlay).collect(),
    };
    repair_timeline(&mut timeline);
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_fallbacks() {
        let json = r#"{ "clips": [ { "asset_ref": "a1", "media_kind": "video" } ] }"#;
        let timeline = timeline_from_json(json).unwrap();
        let clip = &timeline.clips[0];
        assert_eq!(clip.source_duration, 30.0);
        assert_eq!((clip.source_in, clip.source_out), (0.0, 30.0));
        assert_eq!((clip.timeline_start, clip.timeline_end), (0.0, 30.0));
        assert_eq!((clip.width, clip.height), (1920.0, 1080.0));
        assert_eq!(clip.opacity_percent, 100.0);
        assert_eq!(clip.volume_percent, 100.0);
        assert_eq!(clip.z_index, 0);
        assert_eq!(timeline.frame_rate, 30);
    }

    #[test]
    fn test_garbage_numbers_are_replaced() {
        let json = r#"{
            "clips": [ {
                "id": "not-a-uuid",
                "asset_ref": "a1",
                "media_kind": "audio",
                "source_in": "abc",
                "source_out": null,
                "source_duration": "12.5",
                "timeline_start": -4,
                "opacity_percent": 400,
                "crop_rect": { "x": 5 }
            } ],
            "overlays": [ { "text": "hi", "color": "nope", "timeline_end": null } ]
        }"#;
        let timeline = timeline_from_json(json).unwrap();
        let clip = &timeline.clips[0];
        assert_eq!(clip.source_duration, 12.5);
        assert_eq!((clip.source_in, clip.source_out), (0.0, 12.5));
        assert_eq!(clip.timeline_start, 0.0);
        assert_eq!(clip.opacity_percent, 100.0);
        let crop = clip.crop_rect.unwrap();
        assert_eq!((crop.x, crop.width, crop.height), (5.0, 1920.0, 1080.0));

        let overlay = &timeline.overlays[0];
        assert_eq!(overlay.color, ColorRgba::WHITE);
        assert_eq!(overlay.timeline_end, DEFAULT_TEXT_DURATION);
    }

    #[test]
    fn test_repair_fixes_inverted_trim() {
        let json = r#"{ "clips": [ {
            "media_kind": "video",
            "source_in": 8, "source_out": 3, "source_duration": 10,
            "timeline_start": 1, "timeline_end": 0
        } ] }"#;
        let timeline = timeline_from_json(json).unwrap();
        let clip = &timeline.clips[0];
        assert!(clip.source_span() >= MIN_CLIP_LENGTH - 1e-9);
        assert!(clip.source_out <= 10.0);
        assert!(clip.timeline_end > clip.timeline_start);
    }

    #[test]
    fn test_valid_timeline_survives_unchanged() {
        let mut timeline = Timeline::new();
        let mut clip = MediaClip::new(AssetRef::new("a"), MediaKind::Video, "a", Some(10.0), 2.0);
        clip.source_in = 1.0;
        clip.source_out = 5.0;
        clip.timeline_end = 4.0;
        timeline.clips.push(clip);
        timeline.overlays.push(TextOverlay::new("t", 3.0));

        let json = serde_json::to_string(&timeline).unwrap();
        let loaded = timeline_from_json(&json).unwrap();
        assert_eq!(loaded, timeline);
    }
}
