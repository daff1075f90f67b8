//! Show project information.

use std::path::PathBuf;

use super::edit::print_elements;
use super::load_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let p = &project.project;
    let timeline = &project.timeline;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!();

    println!("Assets:");
    for asset in &p.assets {
        let duration = asset
            .duration_secs
            .map(|d| format!("{d:.1}s"))
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {} {} ({}, {}{})",
            asset.asset_ref,
            asset.file_name,
            asset.mime,
            duration,
            if asset.has_audio { ", audio" } else { "" }
        );
    }
    println!();

    println!(
        "Timeline: {}x{} @ {}fps, {} clip(s), {} text overlay(s)",
        timeline.canvas.width,
        timeline.canvas.height,
        timeline.frame_rate,
        timeline.clips.len(),
        timeline.overlays.len()
    );
    print_elements(timeline);
    println!();

    println!("Export settings:");
    println!(
        "  Quality: {:?} (crf {})",
        p.export.quality,
        p.export.quality.crf()
    );
    println!(
        "  Speed: {:?} (preset {})",
        p.export.speed,
        p.export.speed.preset()
    );
    println!("  Audio bitrate: {} kbps", p.export.audio_bitrate_kbps);

    Ok(())
}
