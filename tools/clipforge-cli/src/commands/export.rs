//! Export a project to video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clipforge_common::AppConfig;
use clipforge_project_model::{ExportQuality, ExportSpeed};
use clipforge_render_engine::{
    CancelToken, CompileOptions, EngineProgress, ExportRequest, ExportSession, FfmpegEngine,
    ProgressCallback, ProjectAssetStore, TranscodeEngine,
};

use super::load_project;

fn parse_quality(value: &str) -> anyhow::Result<ExportQuality> {
    match value {
        "low" => Ok(ExportQuality::Low),
        "medium" => Ok(ExportQuality::Medium),
        "high" => Ok(ExportQuality::High),
        "ultra" => Ok(ExportQuality::Ultra),
        _ => Err(anyhow::anyhow!(
            "Unknown quality: {value}. Use: low, medium, high, ultra"
        )),
    }
}

fn parse_speed(value: &str) -> anyhow::Result<ExportSpeed> {
    match value {
        "fastest" => Ok(ExportSpeed::Fastest),
        "fast" => Ok(ExportSpeed::Fast),
        "balanced" => Ok(ExportSpeed::Balanced),
        "slow" => Ok(ExportSpeed::Slow),
        _ => Err(anyhow::anyhow!(
            "Unknown speed: {value}. Use: fastest, fast, balanced, slow"
        )),
    }
}

pub async fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    quality: Option<String>,
    speed: Option<String>,
    allow_empty: bool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    let project = load_project(&path)?;

    let mut settings = project.project.export.clone();
    if let Some(q) = quality.as_deref() {
        settings.quality = parse_quality(q)?;
    }
    if let Some(s) = speed.as_deref() {
        settings.speed = parse_speed(s)?;
    }
    let options = CompileOptions {
        allow_empty,
        ..CompileOptions::from_settings(&settings)
    };

    let output_path = output.unwrap_or_else(|| path.join("exports").join("output.mp4"));
    println!("  Output: {}", output_path.display());
    println!(
        "  Quality: {:?} (crf {}), speed: {:?} (preset {})",
        settings.quality, options.crf, settings.speed, options.preset
    );
    println!("  Duration: {:.2}s", project.timeline.total_duration());

    let engine = FfmpegEngine::new(&config.export.ffmpeg_binary)
        .with_stall_warning(config.export.stall_warning_secs);
    if !engine.is_available() {
        return Err(anyhow::anyhow!(
            "ffmpeg not found ('{}'). Run `clipforge check` for details.",
            engine.binary()
        ));
    }

    let session = ExportSession::new(Arc::new(engine));
    let assets = ProjectAssetStore::new(&project);
    let mut request = ExportRequest::new(&output_path, options);
    request.write_debug_report = config.export.write_debug_report;

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let progress_cb: ProgressCallback = Box::new(|p: EngineProgress| {
        print!(
            "\r  Progress: {:5.1}% ({} @ {:.1} fps)  ",
            p.percent, p.timemark, p.current_fps
        );
        std::io::stdout().flush().ok();
    });

    match session
        .export(&project.timeline, &assets, request, Some(progress_cb), cancel)
        .await
    {
        Ok(path) => {
            println!("\nExport complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("Export failed: {e}"))
        }
    }
}
