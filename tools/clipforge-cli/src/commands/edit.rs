//! Timeline edits: each action becomes one `TimelineCommand`.

use std::path::PathBuf;

use clipforge_common::{AppConfig, SessionClock};
use clipforge_project_model::{
    apply, DragGesture, DragHandle, ElementId, ElementRef, TextOverlay, Timeline, TimelineCommand,
    Zoom,
};

use super::load_project;

pub enum EditAction {
    AddText { text: String },
    Split { id: String, at: f64 },
    TrimStart { id: String, source_in: f64 },
    TrimEnd { id: String, source_out: f64 },
    Move { id: String, start: f64 },
    Resize { id: String, end: f64 },
    Duplicate { id: String },
    Delete { id: String },
}

fn resolve(timeline: &Timeline, needle: &str) -> anyhow::Result<ElementId> {
    timeline
        .resolve_id(needle)
        .ok_or_else(|| anyhow::anyhow!("No unique clip or overlay matches '{needle}'"))
}

fn to_command(timeline: &Timeline, action: EditAction) -> anyhow::Result<TimelineCommand> {
    Ok(match action {
        EditAction::AddText { text } => TimelineCommand::AddText {
            overlay: TextOverlay::new(text, 0.0),
        },
        EditAction::Split { id, at } => TimelineCommand::Split {
            id: resolve(timeline, &id)?,
            at,
        },
        EditAction::TrimStart { id, source_in } => TimelineCommand::TrimStart {
            id: resolve(timeline, &id)?,
            source_in,
        },
        EditAction::TrimEnd { id, source_out } => TimelineCommand::TrimEnd {
            id: resolve(timeline, &id)?,
            source_out,
        },
        EditAction::Move { id, start } => TimelineCommand::Reposition {
            id: resolve(timeline, &id)?,
            timeline_start: start,
        },
        EditAction::Resize { id, end } => TimelineCommand::ResizeRight {
            id: resolve(timeline, &id)?,
            timeline_end: end,
        },
        EditAction::Duplicate { id } => TimelineCommand::Duplicate {
            id: resolve(timeline, &id)?,
        },
        EditAction::Delete { id } => TimelineCommand::Delete {
            id: resolve(timeline, &id)?,
        },
    })
}

pub fn run(path: PathBuf, action: EditAction) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let command = to_command(&project.timeline, action)?;
    tracing::debug!(command = ?command, "Applying timeline command");

    project.timeline =
        apply(&project.timeline, command).map_err(|e| anyhow::anyhow!("Edit rejected: {e}"))?;
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    print_elements(&project.timeline);
    Ok(())
}

/// One line per element, in storage order.
pub fn print_elements(timeline: &Timeline) {
    for clip in &timeline.clips {
        print_element(clip.id, ElementRef::Clip(clip));
    }
    for overlay in &timeline.overlays {
        print_element(overlay.id, ElementRef::Text(overlay));
    }
    println!("Duration: {:.2}s", timeline.total_duration());
}

fn print_element(id: ElementId, element: ElementRef<'_>) {
    let (start, end) = element.span();
    match element {
        ElementRef::Clip(c) => println!(
            "  {} {:<6} [{:>7.2} - {:>7.2}]  source [{:.2} - {:.2}]  z={}  {}",
            id.short(),
            format!("{:?}", c.media_kind).to_lowercase(),
            start,
            end,
            c.source_in,
            c.source_out,
            c.z_index,
            c.file_name
        ),
        ElementRef::Text(t) => println!(
            "  {} {:<6} [{:>7.2} - {:>7.2}]  z={}  \"{}\"",
            id.short(),
            "text",
            start,
            end,
            t.z_index,
            t.text
        ),
    }
}

/// Replay pointer movement through a drag gesture, applying every update
/// the throttle releases plus the final one.
pub fn drag(
    path: PathBuf,
    id: String,
    handle: DragHandle,
    deltas_px: Vec<f64>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let target = resolve(&project.timeline, &id)?;
    let zoom = Zoom::new(config.editor.timeline_zoom_px_per_sec).unwrap_or_default();

    let mut gesture = DragGesture::begin(
        &project.timeline,
        target,
        handle,
        zoom,
        config.editor.drag_updates_hz,
    )
    .map_err(|e| anyhow::anyhow!("Cannot start drag: {e}"))?;

    let clock = SessionClock::start();
    let mut applied = 0usize;
    let mut timeline = project.timeline.clone();
    for delta in deltas_px {
        if let Some(command) = gesture.update(delta, clock.elapsed_ns()) {
            timeline = apply(&timeline, command).map_err(|e| anyhow::anyhow!("Edit rejected: {e}"))?;
            applied += 1;
        }
    }
    if let Some(command) = gesture.finish() {
        timeline = apply(&timeline, command).map_err(|e| anyhow::anyhow!("Edit rejected: {e}"))?;
        applied += 1;
    }
    tracing::debug!(updates = applied, zoom = zoom.px_per_sec(), "Drag replayed");

    project.timeline = timeline;
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    print_elements(&project.timeline);
    Ok(())
}
