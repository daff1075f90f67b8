//! Export sessions: compile a timeline snapshot and run it on an engine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_project_model::Timeline;

use crate::assets::AssetStore;
use crate::command::RenderCommand;
use crate::compiler::{compile, CompileOptions};
use crate::engine::{CancelToken, EngineProgress, ProgressCallback, TranscodeEngine};

/// An export request.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Output file path.
    pub output_path: PathBuf,

    /// Compilation settings.
    pub options: CompileOptions,

    /// Write `<output>.ffmpeg-debug.txt` with the plan and argument vector.
    pub write_debug_report: bool,
}

impl ExportRequest {
    pub fn new(output_path: impl Into<PathBuf>, options: CompileOptions) -> Self {
        Self {
            output_path: output_path.into(),
            options,
            write_debug_report: true,
        }
    }
}

/// Runs at most one export at a time.
pub struct ExportSession {
    engine: Arc<dyn TranscodeEngine>,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the export finishes, however it finishes.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ExportSession {
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self {
            engine,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether an export is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> ClipforgeResult<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| BusyGuard(Arc::clone(&self.busy)))
            .map_err(|_| ClipforgeError::ExportBusy)
    }

    /// Export a snapshot of `timeline`.
    ///
    /// Compilation runs on the caller's task; the engine runs on a blocking
    /// worker. A second call while one is in flight fails with
    /// [`ClipforgeError::ExportBusy`].
    pub async fn export(
        &self,
        timeline: &Timeline,
        assets: &dyn AssetStore,
        request: ExportRequest,
        progress: Option<ProgressCallback>,
        cancel: CancelToken,
    ) -> ClipforgeResult<PathBuf> {
        let guard = self.acquire()?;
        let snapshot = timeline.clone();

        tracing::info!(
            output = %request.output_path.display(),
            clips = snapshot.clips.len(),
            overlays = snapshot.overlays.len(),
            duration_secs = snapshot.total_duration(),
            engine = self.engine.name(),
            "Starting export"
        );

        let started = std::time::Instant::now();
        let command = compile(&snapshot, assets, &request.options)?;
        tracing::info!(
            inputs = command.inputs.len(),
            chains = command.filter_graph.chains.len(),
            has_audio = command.output_map.audio.is_some(),
            plan_build_ms = started.elapsed().as_millis() as u64,
            "Export plan built"
        );

        if let Some(parent) = request.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        if request.write_debug_report {
            write_debug_report(&command, &request.output_path);
        }

        if let Some(cb) = &progress {
            cb(EngineProgress {
                percent: 0.0,
                current_fps: 0.0,
                timemark: clipforge_common::format_timemark(0.0),
            });
        }

        let engine = Arc::clone(&self.engine);
        let output = request.output_path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            engine.execute(&command, &output, progress, &cancel)
        })
        .await
        .map_err(|e| ClipforgeError::render(format!("Export task failed: {e}")))?;

        match &result {
            Ok(path) => tracing::info!(
                output = %path.display(),
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Export finished"
            ),
            Err(err) => tracing::warn!(error = %err, "Export failed"),
        }
        result
    }
}

/// Path of the debug report written next to `output`.
pub fn debug_report_path(output: &Path) -> PathBuf {
    output.with_extension("ffmpeg-debug.txt")
}

fn write_debug_report(command: &RenderCommand, output: &Path) {
    let input_paths: Vec<PathBuf> = command
        .inputs
        .iter()
        .map(|i| PathBuf::from(&i.local_name))
        .collect();
    let argv = command
        .to_ffmpeg_args(&input_paths, output)
        .map(|args| args.join(" "))
        .unwrap_or_else(|e| format!("<unavailable: {e}>"));
    let report = format!(
        "{}filter_complex={}\nffmpeg_args={}\n",
        command.summary(),
        command.filter_graph.to_filter_complex(),
        argv
    );

    let path = debug_report_path(output);
    if let Err(err) = std::fs::write(&path, report) {
        tracing::warn!(error = %err, path = %path.display(), "Failed to write ffmpeg debug report");
    } else {
        tracing::info!(path = %path.display(), "Wrote ffmpeg debug report");
    }
}
