//! Throttled drag gestures on the timeline.
//!
//! A gesture converts pointer movement (in pixels, relative to where the
//! drag began) into timeline commands. Updates are rate limited by an
//! [`UpdateThrottle`]; [`DragGesture::finish`] returns the final position
//! even if it arrived between ticks.

use clipforge_common::UpdateThrottle;

use crate::coords::{pixels_to_seconds, Zoom};
use crate::ops::{OperationError, TimelineCommand};
use crate::timeline::{ElementId, ElementRef, Timeline};

/// What the pointer is dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragHandle {
    /// The whole element body (reposition).
    Body,
    /// The left edge of a clip (trim start).
    LeftEdge,
    /// The right edge (resize right).
    RightEdge,
}

/// An in-progress drag on one element.
#[derive(Debug)]
pub struct DragGesture {
    target: ElementId,
    handle: DragHandle,
    zoom: Zoom,
    origin: f64,
    speed: f64,
    throttle: UpdateThrottle<f64>,
}

impl DragGesture {
    /// Start dragging `handle` of element `target`.
    ///
    /// The left edge of a text overlay has no source window, so it behaves
    /// like dragging the body.
    pub fn begin(
        timeline: &Timeline,
        target: ElementId,
        handle: DragHandle,
        zoom: Zoom,
        updates_hz: u32,
    ) -> Result<Self, OperationError> {
        let element = timeline
            .element(target)
            .ok_or(OperationError::ElementNotFound(target))?;
        let (handle, origin, speed) = match (element, handle) {
            (ElementRef::Clip(c), DragHandle::LeftEdge) => {
                (DragHandle::LeftEdge, c.source_in, c.speed_factor())
            }
            (ElementRef::Text(t), DragHandle::LeftEdge) => (DragHandle::Body, t.timeline_start, 1.0),
            (el, DragHandle::Body) => (DragHandle::Body, el.span().0, 1.0),
            (el, DragHandle::RightEdge) => (DragHandle::RightEdge, el.span().1, 1.0),
        };
        Ok(Self {
            target,
            handle,
            zoom,
            origin,
            speed,
            throttle: UpdateThrottle::new(updates_hz),
        })
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    /// Report pointer movement of `delta_px` since the drag began.
    ///
    /// Returns a command when the throttle lets the update through.
    pub fn update(&mut self, delta_px: f64, now_ns: u64) -> Option<TimelineCommand> {
        let value = self.value_for(delta_px);
        self.throttle.offer(value, now_ns).map(|v| self.command(v))
    }

    /// End the drag, returning the last update the throttle held back.
    pub fn finish(mut self) -> Option<TimelineCommand> {
        self.throttle.flush().map(|v| self.command(v))
    }

    fn value_for(&self, delta_px: f64) -> f64 {
        let delta = pixels_to_seconds(delta_px, self.zoom);
        match self.handle {
            // Timeline seconds map to source seconds at the clip's speed.
            DragHandle::LeftEdge => self.origin + delta * self.speed,
            DragHandle::Body | DragHandle::RightEdge => self.origin + delta,
        }
    }

    fn command(&self, value: f64) -> TimelineCommand {
        let id = self.target;
        match self.handle {
            DragHandle::Body => TimelineCommand::Reposition {
                id,
                timeline_start: value,
            },
            DragHandle::LeftEdge => TimelineCommand::TrimStart {
                id,
                source_in: value,
            },
            DragHandle::RightEdge => TimelineCommand::ResizeRight {
                id,
                timeline_end: value,
            },
        }
    }
}
