//! Mapping between source time, timeline position and pixel offsets.
//!
//! Every function here is pure. Inputs outside a clip's domain, including
//! NaN, yield `None`; inputs are never clamped into range.

use serde::{Deserialize, Serialize};

use crate::clip::MediaClip;

/// Timeline zoom level in pixels per second. Always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Zoom(f64);

impl Zoom {
    /// Validate a zoom level.
    pub fn new(px_per_sec: f64) -> Option<Self> {
        (px_per_sec.is_finite() && px_per_sec > 0.0).then_some(Self(px_per_sec))
    }

    pub fn px_per_sec(self) -> f64 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(100.0)
    }
}

impl<'de> Deserialize<'de> for Zoom {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Zoom::new(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid zoom level {value}")))
    }
}

/// Source time playing at `position`, or `None` outside the clip's placement.
pub fn timeline_to_source(position: f64, clip: &MediaClip) -> Option<f64> {
    let (start, end) = (clip.timeline_start, clip.timeline_end);
    if !(start..=end).contains(&position) || end <= start {
        return None;
    }
    let t = (position - start) / (end - start);
    let source = clip.source_in + t * (clip.source_out - clip.source_in);
    Some(source.max(clip.source_in).min(clip.source_out))
}

/// Timeline position at which `source` plays, or `None` outside the trim window.
pub fn source_to_timeline(source: f64, clip: &MediaClip) -> Option<f64> {
    let (source_in, source_out) = (clip.source_in, clip.source_out);
    if !(source_in..=source_out).contains(&source) || source_out <= source_in {
        return None;
    }
    let t = (source - source_in) / (source_out - source_in);
    let position = clip.timeline_start + t * (clip.timeline_end - clip.timeline_start);
    Some(position.max(clip.timeline_start).min(clip.timeline_end))
}

pub fn seconds_to_pixels(seconds: f64, zoom: Zoom) -> f64 {
    seconds * zoom.px_per_sec()
}

pub fn pixels_to_seconds(pixels: f64, zoom: Zoom) -> f64 {
    pixels / zoom.px_per_sec()
}

/// Pixel offset of `source` measured from the clip's left edge.
pub fn source_to_clip_relative_pixels(source: f64, clip: &MediaClip, zoom: Zoom) -> Option<f64> {
    let position = source_to_timeline(source, clip)?;
    Some(seconds_to_pixels(position, zoom) - seconds_to_pixels(clip.timeline_start, zoom))
}

/// Relative rounding slack accepted at either edge of a clip's pixel width.
const EDGE_SLACK: f64 = 1e-9;

/// Source time under a pixel offset measured from the clip's left edge.
///
/// Offsets that miss an edge only by rounding land on that edge, so the
/// pixel offset of `source_out` always maps back.
pub fn clip_relative_pixels_to_source(pixels: f64, clip: &MediaClip, zoom: Zoom) -> Option<f64> {
    let width = seconds_to_pixels(clip.timeline_span(), zoom);
    let slack = EDGE_SLACK * width.abs().max(1.0);
    if !(pixels >= -slack && pixels <= width + slack) {
        return None;
    }
    let position = (clip.timeline_start + pixels_to_seconds(pixels, zoom))
        .max(clip.timeline_start)
        .min(clip.timeline_end);
    timeline_to_source(position, clip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetRef;
    use crate::clip::MediaKind;
    use proptest::prelude::*;

    fn clip(source_in: f64, source_out: f64, start: f64, end: f64) -> MediaClip {
        let mut c = MediaClip::new(
            AssetRef::new("asset"),
            MediaKind::Video,
            "clip.mp4",
            Some(60.0),
            0.0,
        );
        c.source_in = source_in;
        c.source_out = source_out;
        c.timeline_start = start;
        c.timeline_end = end;
        c
    }

    #[test]
    fn test_zoom_rejects_non_positive_and_non_finite() {
        assert!(Zoom::new(0.0).is_none());
        assert!(Zoom::new(-5.0).is_none());
        assert!(Zoom::new(f64::NAN).is_none());
        assert!(Zoom::new(f64::INFINITY).is_none());
        assert_eq!(Zoom::new(50.0).map(Zoom::px_per_sec), Some(50.0));
        assert!(serde_json::from_str::<Zoom>("0").is_err());
    }

    #[test]
    fn test_timeline_to_source_linear() {
        let c = clip(2.0, 6.0, 10.0, 14.0);
        assert_eq!(timeline_to_source(10.0, &c), Some(2.0));
        assert_eq!(timeline_to_source(12.0, &c), Some(4.0));
        assert_eq!(timeline_to_source(14.0, &c), Some(6.0));
        assert_eq!(timeline_to_source(9.99, &c), None);
        assert_eq!(timeline_to_source(f64::NAN, &c), None);
    }

    #[test]
    fn test_source_to_timeline_respects_speed() {
        // 2x speed: four source seconds over two timeline seconds.
        let c = clip(2.0, 6.0, 0.0, 2.0);
        assert_eq!(source_to_timeline(4.0, &c), Some(1.0));
        assert_eq!(source_to_timeline(6.5, &c), None);
        assert_eq!(source_to_timeline(f64::NAN, &c), None);
    }

    #[test]
    fn test_pixel_helpers() {
        let zoom = Zoom::new(100.0).unwrap();
        assert_eq!(seconds_to_pixels(1.5, zoom), 150.0);
        assert_eq!(pixels_to_seconds(50.0, zoom), 0.5);

        let c = clip(2.0, 6.0, 10.0, 14.0);
        assert_eq!(source_to_clip_relative_pixels(3.0, &c, zoom), Some(100.0));
        assert_eq!(clip_relative_pixels_to_source(100.0, &c, zoom), Some(3.0));
        assert_eq!(clip_relative_pixels_to_source(-1.0, &c, zoom), None);
        assert_eq!(clip_relative_pixels_to_source(401.0, &c, zoom), None);
        assert_eq!(clip_relative_pixels_to_source(f64::NAN, &c, zoom), None);
    }

    #[test]
    fn test_right_edge_pixels_map_back_to_source_out() {
        let c = clip(0.0, 0.2, 0.1, 0.3);
        let zoom = Zoom::new(1.0).unwrap();
        let width = seconds_to_pixels(c.timeline_span(), zoom);
        // Rounding past the right edge still lands on it.
        let overshoot = width * (1.0 + 1e-12);
        assert!(c.timeline_start + pixels_to_seconds(overshoot, zoom) > c.timeline_end);

        for px in [width, overshoot] {
            let back = clip_relative_pixels_to_source(px, &c, zoom).unwrap();
            assert!((back - c.source_out).abs() < 1e-12, "{px} -> {back}");
        }
        assert_eq!(clip_relative_pixels_to_source(width + 0.01, &c, zoom), None);
        let px = source_to_clip_relative_pixels(c.source_out, &c, zoom).unwrap();
        assert!(clip_relative_pixels_to_source(px, &c, zoom).is_some());
    }

    fn arb_clip() -> impl Strategy<Value = MediaClip> {
        (0.0f64..100.0, 0.1f64..50.0, 0.0f64..500.0, 0.25f64..4.0).prop_map(
            |(source_in, span, start, speed)| {
                clip(source_in, source_in + span, start, start + span / speed)
            },
        )
    }

    proptest! {
        #[test]
        fn prop_round_trip_source_time(c in arb_clip(), t in 0.0f64..=1.0) {
            let s = (c.source_in + t * (c.source_out - c.source_in)).min(c.source_out);
            let position = source_to_timeline(s, &c).expect("inside trim window");
            let back = timeline_to_source(position, &c).expect("inside placement");
            prop_assert!((back - s).abs() < 1e-9, "s={s} back={back}");
        }

        #[test]
        fn prop_pixel_round_trip(c in arb_clip(), t in 0.0f64..=1.0, z in 1.0f64..1000.0) {
            let zoom = Zoom::new(z).unwrap();
            let s = (c.source_in + t * (c.source_out - c.source_in)).min(c.source_out);
            let px = source_to_clip_relative_pixels(s, &c, zoom).expect("inside trim window");
            prop_assert!(px >= -1e-6);
            let back = clip_relative_pixels_to_source(px, &c, zoom).expect("inside placement");
            prop_assert!((back - s).abs() < 1e-6, "s={s} back={back}");
        }

        #[test]
        fn prop_mapper_never_panics(c in arb_clip(), x in proptest::num::f64::ANY) {
            let _ = timeline_to_source(x, &c);
            let _ = source_to_timeline(x, &c);
        }
    }
}
