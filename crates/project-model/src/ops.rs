//! Timeline editing operations.
//!
//! Each operation is a pure reducer: [`apply`] takes a timeline snapshot and
//! a [`TimelineCommand`] and returns the next timeline, leaving the input
//! untouched. Trims, moves and resizes clamp out-of-range values instead of
//! failing. Non-finite values leave the target unchanged.
//!
//! All operations preserve a clip's speed factor. The source window is
//! derived from the timeline span at that speed and clamped to the asset.

use serde::{Deserialize, Serialize};

use crate::clip::{CropRect, MediaClip, MIN_CLIP_LENGTH};
use crate::text::{ColorRgba, TextOverlay};
use crate::timeline::{ElementId, Timeline};

/// Tolerance used when comparing spans against [`MIN_CLIP_LENGTH`].
const SPAN_TOLERANCE: f64 = 1e-9;

/// Largest accepted volume, as a percentage.
pub const MAX_VOLUME_PERCENT: f64 = 200.0;

/// An editing command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TimelineCommand {
    /// Append a clip after the last clip of the same media kind.
    AddClip { clip: MediaClip },
    /// Append a text overlay after the last overlay.
    AddText { overlay: TextOverlay },
    Split { id: ElementId, at: f64 },
    Duplicate { id: ElementId },
    Delete { id: ElementId },
    TrimStart { id: ElementId, source_in: f64 },
    TrimEnd { id: ElementId, source_out: f64 },
    /// Reset the source window to the whole asset.
    ClearTrim { id: ElementId },
    Reposition { id: ElementId, timeline_start: f64 },
    ResizeRight { id: ElementId, timeline_end: f64 },
    UpdateClip { id: ElementId, patch: ClipPatch },
    UpdateText { id: ElementId, patch: TextPatch },
}

/// Property changes for a media clip. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation_deg: Option<f64>,
    pub opacity_percent: Option<f64>,
    pub volume_percent: Option<f64>,
    pub z_index: Option<i32>,
    /// `Some(None)` removes the crop.
    pub crop_rect: Option<Option<CropRect>>,
}

/// Property changes for a text overlay. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPatch {
    pub text: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub font_family: Option<String>,
    pub font_size_px: Option<f64>,
    pub color: Option<ColorRgba>,
    pub opacity_percent: Option<f64>,
    pub z_index: Option<i32>,
}

/// Recoverable operation failures. The timeline is left unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    #[error("split position {at} is outside element {id} ({start}..{end})")]
    SplitOutOfRange {
        id: ElementId,
        at: f64,
        start: f64,
        end: f64,
    },

    #[error("no element with id {0}")]
    ElementNotFound(ElementId),
}

impl From<OperationError> for clipforge_common::ClipforgeError {
    fn from(err: OperationError) -> Self {
        Self::operation(err.to_string())
    }
}

/// Apply a command to a timeline snapshot.
pub fn apply(timeline: &Timeline, command: TimelineCommand) -> Result<Timeline, OperationError> {
    let mut next = timeline.clone();
    match command {
        TimelineCommand::AddClip { clip } => add_clip(&mut next, clip),
        TimelineCommand::AddText { overlay } => add_text(&mut next, overlay),
        TimelineCommand::Split { id, at } => split(&mut next, id, at)?,
        TimelineCommand::Duplicate { id } => duplicate(&mut next, id)?,
        TimelineCommand::Delete { id } => delete(&mut next, id)?,
        TimelineCommand::TrimStart { id, source_in } => {
            trim_start(clip_mut(&mut next, id)?, source_in)
        }
        TimelineCommand::TrimEnd { id, source_out } => {
            trim_end(clip_mut(&mut next, id)?, source_out)
        }
        TimelineCommand::ClearTrim { id } => clear_trim(clip_mut(&mut next, id)?),
        TimelineCommand::Reposition { id, timeline_start } => {
            reposition(&mut next, id, timeline_start)?
        }
        TimelineCommand::ResizeRight { id, timeline_end } => {
            resize_right(&mut next, id, timeline_end)?
        }
        TimelineCommand::UpdateClip { id, patch } => update_clip(clip_mut(&mut next, id)?, patch),
        TimelineCommand::UpdateText { id, patch } => {
            let overlay = next
                .overlays
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(OperationError::ElementNotFound(id))?;
            update_text(overlay, patch)
        }
    }
    Ok(next)
}

fn clip_mut(timeline: &mut Timeline, id: ElementId) -> Result<&mut MediaClip, OperationError> {
    timeline
        .clips
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or(OperationError::ElementNotFound(id))
}

fn add_clip(timeline: &mut Timeline, mut clip: MediaClip) {
    let start = timeline
        .clips
        .iter()
        .filter(|c| c.media_kind == clip.media_kind)
        .map(|c| c.timeline_end)
        .fold(0.0, f64::max);
    let span = clip.timeline_span();
    clip.timeline_start = start;
    clip.timeline_end = start + span;
    timeline.clips.push(clip);
}

fn add_text(timeline: &mut Timeline, mut overlay: TextOverlay) {
    let start = timeline
        .overlays
        .iter()
        .map(|t| t.timeline_end)
        .fold(0.0, f64::max);
    let span = overlay.timeline_span();
    overlay.timeline_start = start;
    overlay.timeline_end = start + span;
    timeline.overlays.push(overlay);
}

fn split(timeline: &mut Timeline, id: ElementId, at: f64) -> Result<(), OperationError> {
    if let Some(index) = timeline.clip_index(id) {
        let (first, second) = split_clip(&timeline.clips[index], at)?;
        timeline.clips.splice(index..=index, [first, second]);
        return Ok(());
    }
    if let Some(index) = timeline.overlay_index(id) {
        let original = &timeline.overlays[index];
        if !(at > original.timeline_start && at < original.timeline_end) {
            return Err(OperationError::SplitOutOfRange {
                id,
                at,
                start: original.timeline_start,
                end: original.timeline_end,
            });
        }
        let mut first = original.clone();
        let mut second = original.clone();
        first.id = ElementId::new();
        first.timeline_end = at;
        second.id = ElementId::new();
        second.timeline_start = at;
        timeline.overlays.splice(index..=index, [first, second]);
        return Ok(());
    }
    Err(OperationError::ElementNotFound(id))
}

fn split_clip(clip: &MediaClip, at: f64) -> Result<(MediaClip, MediaClip), OperationError> {
    let out_of_range = || OperationError::SplitOutOfRange {
        id: clip.id,
        at,
        start: clip.timeline_start,
        end: clip.timeline_end,
    };
    if !(at > clip.timeline_start && at < clip.timeline_end) {
        return Err(out_of_range());
    }

    let ratio = (at - clip.timeline_start) / clip.timeline_span();
    let split_source = clip.source_in + ratio * clip.source_span();

    // Both halves must keep the minimum trimmed span.
    if split_source - clip.source_in < MIN_CLIP_LENGTH - SPAN_TOLERANCE
        || clip.source_out - split_source < MIN_CLIP_LENGTH - SPAN_TOLERANCE
    {
        return Err(out_of_range());
    }

    let mut first = clip.clone();
    first.id = ElementId::new();
    first.timeline_end = at;
    first.source_out = split_source;

    let mut second = clip.clone();
    second.id = ElementId::new();
    second.timeline_start = at;
    second.source_in = split_source;

    Ok((first, second))
}

fn duplicate(timeline: &mut Timeline, id: ElementId) -> Result<(), OperationError> {
    if let Some(index) = timeline.clip_index(id) {
        let mut copy = timeline.clips[index].clone();
        copy.id = ElementId::new();
        timeline.clips.insert(index + 1, copy);
        return Ok(());
    }
    if let Some(index) = timeline.overlay_index(id) {
        let mut copy = timeline.overlays[index].clone();
        copy.id = ElementId::new();
        timeline.overlays.insert(index + 1, copy);
        return Ok(());
    }
    Err(OperationError::ElementNotFound(id))
}

fn delete(timeline: &mut Timeline, id: ElementId) -> Result<(), OperationError> {
    if let Some(index) = timeline.clip_index(id) {
        timeline.clips.remove(index);
        return Ok(());
    }
    if let Some(index) = timeline.overlay_index(id) {
        timeline.overlays.remove(index);
        return Ok(());
    }
    Err(OperationError::ElementNotFound(id))
}

/// Move the in-point, keeping `timeline_end` fixed.
fn trim_start(clip: &mut MediaClip, new_source_in: f64) {
    if new_source_in.is_nan() {
        return;
    }
    let speed = clip.speed_factor();
    let mut source_in = new_source_in.min(clip.source_out - MIN_CLIP_LENGTH).max(0.0);

    // The clip may not start before zero on the timeline.
    let earliest_in = clip.source_out - clip.timeline_end * speed;
    if source_in < earliest_in {
        source_in = earliest_in.min(clip.source_out - MIN_CLIP_LENGTH);
    }

    clip.source_in = source_in;
    clip.timeline_start = (clip.timeline_end - clip.source_span() / speed).max(0.0);
}

/// Whether an end value can be clamped. Images have no upper bound, so an
/// infinite end is ignored for them.
fn accepts_end(clip: &MediaClip, value: f64) -> bool {
    !value.is_nan() && (value.is_finite() || clip.source_limit().is_finite())
}

/// Move the out-point, keeping `timeline_start` fixed.
fn trim_end(clip: &mut MediaClip, new_source_out: f64) {
    if !accepts_end(clip, new_source_out) {
        return;
    }
    let speed = clip.speed_factor();
    let source_out = new_source_out
        .min(clip.source_limit())
        .max(clip.source_in + MIN_CLIP_LENGTH);

    clip.source_out = source_out;
    clip.timeline_end = clip.timeline_start + clip.source_span() / speed;
}

fn clear_trim(clip: &mut MediaClip) {
    let speed = clip.speed_factor();
    let span = if clip.source_limit().is_finite() {
        clip.source_duration.max(MIN_CLIP_LENGTH)
    } else {
        clip.source_span()
    };
    clip.source_in = 0.0;
    clip.source_out = span;
    clip.timeline_end = clip.timeline_start + span / speed;
}

fn reposition(
    timeline: &mut Timeline,
    id: ElementId,
    new_start: f64,
) -> Result<(), OperationError> {
    let (start, end) = if let Some(clip) = timeline.clips.iter_mut().find(|c| c.id == id) {
        (&mut clip.timeline_start, &mut clip.timeline_end)
    } else if let Some(overlay) = timeline.overlays.iter_mut().find(|t| t.id == id) {
        (&mut overlay.timeline_start, &mut overlay.timeline_end)
    } else {
        return Err(OperationError::ElementNotFound(id));
    };
    if !new_start.is_finite() {
        return Ok(());
    }
    let span = *end - *start;
    *start = new_start.max(0.0);
    *end = *start + span;
    Ok(())
}

fn resize_right(
    timeline: &mut Timeline,
    id: ElementId,
    new_end: f64,
) -> Result<(), OperationError> {
    if let Some(clip) = timeline.clips.iter_mut().find(|c| c.id == id) {
        if !accepts_end(clip, new_end) {
            return Ok(());
        }
        let speed = clip.speed_factor();
        let max_span = (clip.source_limit() - clip.source_in).max(MIN_CLIP_LENGTH);
        let source_span = ((new_end - clip.timeline_start) * speed)
            .min(max_span)
            .max(MIN_CLIP_LENGTH);
        clip.source_out = clip.source_in + source_span;
        clip.timeline_end = clip.timeline_start + source_span / speed;
        return Ok(());
    }
    if let Some(overlay) = timeline.overlays.iter_mut().find(|t| t.id == id) {
        if new_end.is_finite() {
            overlay.timeline_end = new_end.max(overlay.timeline_start + MIN_CLIP_LENGTH);
        }
        return Ok(());
    }
    Err(OperationError::ElementNotFound(id))
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn update_clip(clip: &mut MediaClip, patch: ClipPatch) {
    if let Some(x) = finite(patch.x) {
        clip.x = x;
    }
    if let Some(y) = finite(patch.y) {
        clip.y = y;
    }
    if let Some(width) = finite(patch.width) {
        clip.width = width.max(1.0);
    }
    if let Some(height) = finite(patch.height) {
        clip.height = height.max(1.0);
    }
    if let Some(rotation) = finite(patch.rotation_deg) {
        clip.rotation_deg = rotation % 360.0;
    }
    if let Some(opacity) = finite(patch.opacity_percent) {
        clip.opacity_percent = opacity.clamp(0.0, 100.0);
    }
    if let Some(volume) = finite(patch.volume_percent) {
        clip.volume_percent = volume.clamp(0.0, MAX_VOLUME_PERCENT);
    }
    if let Some(z) = patch.z_index {
        clip.z_index = z;
    }
    if let Some(crop) = patch.crop_rect {
        clip.crop_rect = crop.filter(|r| {
            [r.x, r.y, r.width, r.height].iter().all(|v| v.is_finite())
                && r.x >= 0.0
                && r.y >= 0.0
                && r.width >= 1.0
                && r.height >= 1.0
        });
    }
}

fn update_text(overlay: &mut TextOverlay, patch: TextPatch) {
    if let Some(text) = patch.text {
        overlay.text = text;
    }
    if let Some(x) = finite(patch.x) {
        overlay.x = x;
    }
    if let Some(y) = finite(patch.y) {
        overlay.y = y;
    }
    if let Some(family) = patch.font_family.filter(|f| !f.trim().is_empty()) {
        overlay.font_family = family;
    }
    if let Some(size) = finite(patch.font_size_px) {
        overlay.font_size_px = size.max(1.0);
    }
    if let Some(color) = patch.color {
        overlay.color = color;
    }
    if let Some(opacity) = finite(patch.opacity_percent) {
        overlay.opacity_percent = opacity.clamp(0.0, 100.0);
    }
    if let Some(z) = patch.z_index {
        overlay.z_index = z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetRef;
    use crate::clip::MediaKind;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn video(duration: f64) -> MediaClip {
        MediaClip::new(
            AssetRef::new("asset"),
            MediaKind::Video,
            "clip.mp4",
            Some(duration),
            0.0,
        )
    }

    fn with_clip(clip: MediaClip) -> (Timeline, ElementId) {
        let id = clip.id;
        let mut timeline = Timeline::new();
        timeline.clips.push(clip);
        (timeline, id)
    }

    fn assert_invariants(clip: &MediaClip) {
        assert!(clip.source_in >= 0.0, "source_in {}", clip.source_in);
        assert!(clip.source_span() >= MIN_CLIP_LENGTH - EPS);
        assert!(clip.source_out <= clip.source_limit() + EPS);
        assert!(clip.timeline_start >= 0.0);
        assert!(clip.timeline_end > clip.timeline_start);
    }

    #[test]
    fn test_split_trimmed_clip() {
        // 10s asset trimmed to [2,6) placed at [0,4), split at 2.
        let mut clip = video(10.0);
        clip.source_in = 2.0;
        clip.source_out = 6.0;
        clip.timeline_start = 0.0;
        clip.timeline_end = 4.0;
        let (timeline, id) = with_clip(clip);

        let next = apply(&timeline, TimelineCommand::Split { id, at: 2.0 }).unwrap();
        assert_eq!(next.clips.len(), 2);
        let (a, b) = (&next.clips[0], &next.clips[1]);
        assert_eq!((a.source_in, a.source_out), (2.0, 4.0));
        assert_eq!((a.timeline_start, a.timeline_end), (0.0, 2.0));
        assert_eq!((b.source_in, b.source_out), (4.0, 6.0));
        assert_eq!((b.timeline_start, b.timeline_end), (2.0, 4.0));
        assert_ne!(a.id, id);
        assert_ne!(b.id, id);
        assert_ne!(a.id, b.id);
        assert!(next.clip(id).is_none());
    }

    #[test]
    fn test_split_at_edges_fails_and_leaves_timeline() {
        let (timeline, id) = with_clip(video(4.0));
        for at in [0.0, 4.0, -1.0, 9.0, f64::NAN] {
            let err = apply(&timeline, TimelineCommand::Split { id, at }).unwrap_err();
            assert!(matches!(err, OperationError::SplitOutOfRange { .. }), "{at}");
        }
    }

    #[test]
    fn test_split_keeps_minimum_span_on_both_halves() {
        let (timeline, id) = with_clip(video(4.0));
        for at in [0.05, 3.95] {
            let err = apply(&timeline, TimelineCommand::Split { id, at }).unwrap_err();
            assert_eq!(
                err,
                OperationError::SplitOutOfRange { id, at, start: 0.0, end: 4.0 },
                "{at}"
            );
        }

        let next = apply(&timeline, TimelineCommand::Split { id, at: 0.1 }).unwrap();
        assert_eq!(next.clips.len(), 2);
        assert!((next.clips[0].source_span() - 0.1).abs() < EPS);
        next.clips.iter().for_each(assert_invariants);

        // Overlays have no source window, so any interior point splits.
        let overlay = TextOverlay::new("caption", 0.0);
        let text_id = overlay.id;
        let mut timeline = Timeline::new();
        timeline.overlays.push(overlay);
        let next = apply(&timeline, TimelineCommand::Split { id: text_id, at: 0.05 }).unwrap();
        assert_eq!(next.overlays.len(), 2);
    }

    #[test]
    fn test_split_preserves_order_among_neighbours() {
        let mut timeline = Timeline::new();
        let clips: Vec<_> = (0..3).map(|_| video(4.0)).collect();
        let ids: Vec<_> = clips.iter().map(|c| c.id).collect();
        timeline.clips = clips;

        let next = apply(&timeline, TimelineCommand::Split { id: ids[1], at: 1.0 }).unwrap();
        assert_eq!(next.clips.len(), 4);
        assert_eq!(next.clips[0].id, ids[0]);
        assert_eq!(next.clips[3].id, ids[2]);
    }

    #[test]
    fn test_split_text_overlay() {
        let overlay = TextOverlay::new("caption", 0.0);
        let id = overlay.id;
        let mut timeline = Timeline::new();
        timeline.overlays.push(overlay);

        let next = apply(&timeline, TimelineCommand::Split { id, at: 3.0 }).unwrap();
        assert_eq!(next.overlays.len(), 2);
        assert_eq!(next.overlays[0].timeline_end, 3.0);
        assert_eq!(next.overlays[1].timeline_start, 3.0);
        assert_eq!(next.overlays[1].text, "caption");
    }

    #[test]
    fn test_unknown_id_is_reported() {
        let (timeline, _) = with_clip(video(4.0));
        let ghost = ElementId::new();
        let commands = [
            TimelineCommand::Delete { id: ghost },
            TimelineCommand::Duplicate { id: ghost },
            TimelineCommand::TrimStart { id: ghost, source_in: 1.0 },
            TimelineCommand::Reposition { id: ghost, timeline_start: 1.0 },
            TimelineCommand::ResizeRight { id: ghost, timeline_end: 1.0 },
        ];
        for command in commands {
            assert_eq!(
                apply(&timeline, command),
                Err(OperationError::ElementNotFound(ghost))
            );
        }
    }

    #[test]
    fn test_duplicate_inserts_after_source() {
        let mut timeline = Timeline::new();
        let (a, b) = (video(4.0), video(5.0));
        let (a_id, b_id) = (a.id, b.id);
        timeline.clips = vec![a, b];

        let next = apply(&timeline, TimelineCommand::Duplicate { id: a_id }).unwrap();
        assert_eq!(next.clips.len(), 3);
        assert_eq!(next.clips[0].id, a_id);
        assert_ne!(next.clips[1].id, a_id);
        assert_eq!(next.clips[1].timeline_start, next.clips[0].timeline_start);
        assert_eq!(next.clips[1].source_out, next.clips[0].source_out);
        assert_eq!(next.clips[2].id, b_id);
    }

    #[test]
    fn test_delete_removes_only_target() {
        let mut timeline = Timeline::new();
        let (a, b) = (video(4.0), video(5.0));
        let b_id = b.id;
        timeline.clips = vec![a.clone(), b];
        let next = apply(&timeline, TimelineCommand::Delete { id: b_id }).unwrap();
        assert_eq!(next.clips, vec![a]);
    }

    #[test]
    fn test_trim_start_keeps_end_fixed() {
        let mut clip = video(10.0);
        clip.timeline_start = 5.0;
        clip.timeline_end = 15.0;
        let (timeline, id) = with_clip(clip);

        let next = apply(&timeline, TimelineCommand::TrimStart { id, source_in: 3.0 }).unwrap();
        let c = next.clip(id).unwrap();
        assert_eq!(c.source_in, 3.0);
        assert_eq!(c.timeline_end, 15.0);
        assert!((c.timeline_start - 8.0).abs() < EPS);
    }

    #[test]
    fn test_trim_start_cannot_push_clip_before_zero() {
        let mut clip = video(10.0);
        clip.source_in = 5.0;
        clip.timeline_start = 2.0;
        clip.timeline_end = 7.0;
        let (timeline, id) = with_clip(clip);

        let next = apply(&timeline, TimelineCommand::TrimStart { id, source_in: 0.0 }).unwrap();
        let c = next.clip(id).unwrap();
        assert!(c.timeline_start.abs() < EPS);
        assert!((c.source_in - 3.0).abs() < EPS);
        assert_invariants(c);
    }

    #[test]
    fn test_trim_end_clamps_to_asset_duration() {
        let (timeline, id) = with_clip(video(10.0));
        let next = apply(&timeline, TimelineCommand::TrimEnd { id, source_out: 99.0 }).unwrap();
        assert_eq!(next.clip(id).unwrap().source_out, 10.0);

        let next = apply(&timeline, TimelineCommand::TrimEnd { id, source_out: -5.0 }).unwrap();
        let c = next.clip(id).unwrap();
        assert!((c.source_span() - MIN_CLIP_LENGTH).abs() < EPS);
        assert!((c.timeline_end - MIN_CLIP_LENGTH).abs() < EPS);
    }

    #[test]
    fn test_trim_preserves_speed() {
        let mut clip = video(20.0);
        clip.timeline_end = 10.0; // 2x
        let (timeline, id) = with_clip(clip);
        let next = apply(&timeline, TimelineCommand::TrimEnd { id, source_out: 8.0 }).unwrap();
        let c = next.clip(id).unwrap();
        assert!((c.speed_factor() - 2.0).abs() < EPS);
        assert!((c.timeline_end - 4.0).abs() < EPS);
    }

    #[test]
    fn test_image_trim_end_is_unbounded() {
        let mut clip = video(30.0);
        clip.media_kind = MediaKind::Image;
        let (timeline, id) = with_clip(clip);
        let next = apply(&timeline, TimelineCommand::TrimEnd { id, source_out: 120.0 }).unwrap();
        assert_eq!(next.clip(id).unwrap().timeline_end, 120.0);
    }

    #[test]
    fn test_clear_trim_restores_full_asset() {
        let mut clip = video(10.0);
        clip.source_in = 2.0;
        clip.source_out = 4.0;
        clip.timeline_start = 1.0;
        clip.timeline_end = 3.0;
        let (timeline, id) = with_clip(clip);
        let next = apply(&timeline, TimelineCommand::ClearTrim { id }).unwrap();
        let c = next.clip(id).unwrap();
        assert_eq!((c.source_in, c.source_out), (0.0, 10.0));
        assert_eq!((c.timeline_start, c.timeline_end), (1.0, 11.0));
    }

    #[test]
    fn test_reposition_translates_and_clamps() {
        let (timeline, id) = with_clip(video(4.0));
        let next = apply(&timeline, TimelineCommand::Reposition { id, timeline_start: 6.0 }).unwrap();
        let c = next.clip(id).unwrap();
        assert_eq!((c.timeline_start, c.timeline_end), (6.0, 10.0));
        assert_eq!((c.source_in, c.source_out), (0.0, 4.0));

        let next = apply(&next, TimelineCommand::Reposition { id, timeline_start: -3.0 }).unwrap();
        let c = next.clip(id).unwrap();
        assert_eq!((c.timeline_start, c.timeline_end), (0.0, 4.0));
    }

    #[test]
    fn test_resize_right_scales_source_span() {
        let mut clip = video(10.0);
        clip.source_out = 4.0;
        clip.timeline_end = 4.0;
        let (timeline, id) = with_clip(clip);

        let next = apply(&timeline, TimelineCommand::ResizeRight { id, timeline_end: 6.0 }).unwrap();
        let c = next.clip(id).unwrap();
        assert_eq!((c.source_out, c.timeline_end), (6.0, 6.0));

        let next = apply(&timeline, TimelineCommand::ResizeRight { id, timeline_end: 50.0 }).unwrap();
        let c = next.clip(id).unwrap();
        assert_eq!((c.source_out, c.timeline_end), (10.0, 10.0));
    }

    #[test]
    fn test_resize_right_text_overlay() {
        let overlay = TextOverlay::new("t", 2.0);
        let id = overlay.id;
        let mut timeline = Timeline::new();
        timeline.overlays.push(overlay);
        let next = apply(&timeline, TimelineCommand::ResizeRight { id, timeline_end: 0.0 }).unwrap();
        let t = next.overlay(id).unwrap();
        assert!((t.timeline_span() - MIN_CLIP_LENGTH).abs() < EPS);
    }

    #[test]
    fn test_add_clip_appends_after_same_kind() {
        let timeline = Timeline::new();
        let first = video(4.0);
        let next = apply(&timeline, TimelineCommand::AddClip { clip: first }).unwrap();
        let next = apply(&next, TimelineCommand::AddClip { clip: video(3.0) }).unwrap();
        assert_eq!(next.clips[1].timeline_start, 4.0);
        assert_eq!(next.clips[1].timeline_end, 7.0);

        let mut audio = video(5.0);
        audio.media_kind = MediaKind::Audio;
        let next = apply(&next, TimelineCommand::AddClip { clip: audio }).unwrap();
        assert_eq!(next.clips[2].timeline_start, 0.0);
    }

    #[test]
    fn test_add_text_appends_after_last_overlay() {
        let timeline = Timeline::new();
        let next = apply(
            &timeline,
            TimelineCommand::AddText { overlay: TextOverlay::new("a", 0.0) },
        )
        .unwrap();
        let next = apply(
            &next,
            TimelineCommand::AddText { overlay: TextOverlay::new("b", 0.0) },
        )
        .unwrap();
        assert_eq!(next.overlays[1].timeline_start, 10.0);
        assert_eq!(next.overlays[1].timeline_end, 20.0);
    }

    #[test]
    fn test_update_clip_clamps_properties() {
        let (timeline, id) = with_clip(video(4.0));
        let patch = ClipPatch {
            opacity_percent: Some(150.0),
            volume_percent: Some(500.0),
            width: Some(f64::NAN),
            z_index: Some(3),
            crop_rect: Some(Some(CropRect { x: 10.0, y: 10.0, width: 640.0, height: 360.0 })),
            ..Default::default()
        };
        let next = apply(&timeline, TimelineCommand::UpdateClip { id, patch }).unwrap();
        let c = next.clip(id).unwrap();
        assert_eq!(c.opacity_percent, 100.0);
        assert_eq!(c.volume_percent, MAX_VOLUME_PERCENT);
        assert_eq!(c.width, 1920.0);
        assert_eq!(c.z_index, 3);
        assert!(c.crop_rect.is_some());
    }

    #[test]
    fn test_update_text_ignores_blank_font() {
        let overlay = TextOverlay::new("t", 0.0);
        let id = overlay.id;
        let mut timeline = Timeline::new();
        timeline.overlays.push(overlay);
        let patch = TextPatch {
            text: Some("Title".into()),
            font_family: Some("  ".into()),
            color: Some(ColorRgba::BLACK),
            ..Default::default()
        };
        let next = apply(&timeline, TimelineCommand::UpdateText { id, patch }).unwrap();
        let t = next.overlay(id).unwrap();
        assert_eq!(t.text, "Title");
        assert_eq!(t.font_family, "Arial");
        assert_eq!(t.color, ColorRgba::BLACK);
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let (timeline, id) = with_clip(video(4.0));
        let before = timeline.clone();
        let _ = apply(&timeline, TimelineCommand::Delete { id }).unwrap();
        assert_eq!(timeline, before);
    }

    fn arb_clip() -> impl Strategy<Value = MediaClip> {
        (1.0f64..100.0, 0.0f64..1.0, 0.0f64..1.0, 0.0f64..200.0, 0.25f64..4.0).prop_map(
            |(duration, a, b, start, speed)| {
                let mut clip = video(duration);
                let usable = duration - MIN_CLIP_LENGTH;
                let source_in = a * usable;
                let source_out = source_in + MIN_CLIP_LENGTH + b * (duration - source_in - MIN_CLIP_LENGTH);
                clip.source_in = source_in;
                clip.source_out = source_out.min(duration);
                clip.timeline_start = start;
                clip.timeline_end = start + clip.source_span() / speed;
                clip
            },
        )
    }

    fn adversarial() -> impl Strategy<Value = f64> {
        prop_oneof![
            -1000.0f64..1000.0,
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            Just(0.0),
            Just(-0.0),
        ]
    }

    proptest! {
        #[test]
        fn prop_split_conserves_spans(clip in arb_clip(), t in 0.05f64..0.95) {
            let at = clip.timeline_start + t * clip.timeline_span();
            let (timeline, id) = with_clip(clip.clone());
            if let Ok(next) = apply(&timeline, TimelineCommand::Split { id, at }) {
                let (a, b) = (&next.clips[0], &next.clips[1]);
                prop_assert!((a.timeline_span() + b.timeline_span() - clip.timeline_span()).abs() < 1e-9);
                prop_assert!((a.source_span() + b.source_span() - clip.source_span()).abs() < 1e-9);
                prop_assert!((a.speed_factor() - clip.speed_factor()).abs() < 1e-6);
                prop_assert_eq!(a.timeline_end, b.timeline_start);
                prop_assert_eq!(a.source_out, b.source_in);
            }
        }

        #[test]
        fn prop_trim_start_monotonic(clip in arb_clip(), value in adversarial()) {
            let (timeline, id) = with_clip(clip);
            let next = apply(&timeline, TimelineCommand::TrimStart { id, source_in: value }).unwrap();
            let c = next.clip(id).unwrap();
            prop_assert!(c.source_in < c.source_out);
            prop_assert!(c.source_span() >= MIN_CLIP_LENGTH - 1e-9);
            prop_assert!(c.source_in >= 0.0);
            prop_assert!(c.timeline_start >= 0.0);
            prop_assert!(c.timeline_end > c.timeline_start);
        }

        #[test]
        fn prop_trim_end_monotonic(clip in arb_clip(), value in adversarial()) {
            let (timeline, id) = with_clip(clip);
            let next = apply(&timeline, TimelineCommand::TrimEnd { id, source_out: value }).unwrap();
            let c = next.clip(id).unwrap();
            prop_assert!(c.source_in < c.source_out);
            prop_assert!(c.source_span() >= MIN_CLIP_LENGTH - 1e-9);
            prop_assert!(c.source_out <= c.source_duration + 1e-9);
            prop_assert!(c.timeline_end > c.timeline_start);
        }

        #[test]
        fn prop_resize_and_move_keep_invariants(clip in arb_clip(), a in adversarial(), b in adversarial()) {
            let (timeline, id) = with_clip(clip.clone());
            let next = apply(&timeline, TimelineCommand::ResizeRight { id, timeline_end: a }).unwrap();
            let next = apply(&next, TimelineCommand::Reposition { id, timeline_start: b }).unwrap();
            let c = next.clip(id).unwrap();
            assert_invariants(c);
            prop_assert!((c.speed_factor() - clip.speed_factor()).abs() < 1e-6);
        }
    }
}
