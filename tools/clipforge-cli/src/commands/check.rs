//! Check for the external tools the editor relies on.

use clipforge_common::AppConfig;
use clipforge_render_engine::{command_exists, FfmpegEngine, TranscodeEngine};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("ClipForge System Check");
    println!("{}", "=".repeat(50));

    let engine = FfmpegEngine::new(&config.export.ffmpeg_binary);
    let ffmpeg_ok = engine.is_available();
    if ffmpeg_ok {
        let version = engine.version().unwrap_or_else(|| "unknown version".to_string());
        println!("[OK] ffmpeg: {} ({version})", engine.binary());
    } else {
        println!("[FAIL] ffmpeg: '{}' not found", engine.binary());
        println!("       Install ffmpeg or set export.ffmpeg_binary in the config file.");
    }

    let ffprobe = &config.export.ffprobe_binary;
    if command_exists(ffprobe) {
        println!("[OK] ffprobe: {ffprobe}");
    } else {
        println!("[WARN] ffprobe: '{ffprobe}' not found (imports fall back to a 30s duration)");
    }

    println!("[OK] Projects directory: {}", config.projects_dir.display());

    println!();
    if ffmpeg_ok {
        println!("All required tools are available. ClipForge is ready.");
    } else {
        println!("Export is unavailable until ffmpeg is installed.");
    }

    Ok(())
}
