//! Import a media file into a project and append it to the timeline.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use clipforge_common::AppConfig;
use clipforge_project_model::{
    apply, kind_for_mime, mime_for_extension, AssetRecord, AssetRef, MediaClip, MediaKind,
    TimelineCommand,
};

use super::edit::print_elements;
use super::load_project;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Default)]
struct MediaProbe {
    duration_secs: Option<f64>,
    has_audio: Option<bool>,
}

fn probe(ffprobe: &str, file: &Path) -> MediaProbe {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration:stream=codec_type",
            "-of",
            "json",
        ])
        .arg(file)
        .output();

    let output = match output {
        Ok(o) if o.status.success() => o,
        Ok(o) => {
            tracing::warn!(
                status = %o.status,
                stderr = %String::from_utf8_lossy(&o.stderr).trim(),
                "ffprobe failed"
            );
            return MediaProbe::default();
        }
        Err(e) => {
            tracing::warn!(error = %e, binary = ffprobe, "ffprobe unavailable");
            return MediaProbe::default();
        }
    };

    match serde_json::from_slice::<ProbeOutput>(&output.stdout) {
        Ok(parsed) => MediaProbe {
            duration_secs: parsed
                .format
                .and_then(|f| f.duration)
                .and_then(|d| d.parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d > 0.0),
            has_audio: Some(
                parsed
                    .streams
                    .iter()
                    .any(|s| s.codec_type.as_deref() == Some("audio")),
            ),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable ffprobe output");
            MediaProbe::default()
        }
    }
}

pub fn run(path: PathBuf, file: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;

    if !file.is_file() {
        return Err(anyhow::anyhow!("No such file: {}", file.display()));
    }
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let mime = mime_for_extension(ext)
        .ok_or_else(|| anyhow::anyhow!("Unsupported media type: .{ext}"))?;
    let kind = kind_for_mime(mime)
        .ok_or_else(|| anyhow::anyhow!("Unsupported media type: {mime}"))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());

    let probed = if kind == MediaKind::Image {
        MediaProbe::default()
    } else {
        probe(&config.export.ffprobe_binary, &file)
    };
    // Without a probe only audio files are assumed to carry sound.
    let has_audio = kind.can_carry_audio() && probed.has_audio.unwrap_or(kind == MediaKind::Audio);

    let asset_ref = AssetRef::generate();
    let stored = format!(
        "sources/{}.{}",
        asset_ref,
        clipforge_project_model::extension_for_mime(mime).unwrap_or(ext)
    );
    std::fs::copy(&file, project.root.join(&stored))
        .map_err(|e| anyhow::anyhow!("Failed to copy {}: {e}", file.display()))?;

    project.project.assets.push(AssetRecord {
        asset_ref: asset_ref.clone(),
        file_name: file_name.clone(),
        path: stored,
        mime: mime.to_string(),
        duration_secs: probed.duration_secs,
        has_audio,
    });

    let clip = MediaClip::new(asset_ref, kind, &file_name, probed.duration_secs, 0.0);
    println!(
        "Imported {} as {:?} ({:.2}s{})",
        file_name,
        kind,
        clip.source_duration,
        if probed.duration_secs.is_none() && kind != MediaKind::Image {
            ", duration unknown"
        } else {
            ""
        }
    );

    project.timeline = apply(&project.timeline, TimelineCommand::AddClip { clip })
        .map_err(|e| anyhow::anyhow!("Edit rejected: {e}"))?;
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    print_elements(&project.timeline);
    Ok(())
}
