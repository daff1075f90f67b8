//! Transcoding engines.
//!
//! The engine executes a [`RenderCommand`]: it stages in-memory inputs,
//! spawns ffmpeg with `-progress pipe:1`, reports progress as it arrives and
//! returns the output path or the engine's own failure message.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use clipforge_common::{format_timemark, ClipforgeError, ClipforgeResult};

use crate::assets::AssetSource;
use crate::command::RenderCommand;

/// Progress callback for engine execution.
pub type ProgressCallback = Box<dyn Fn(EngineProgress) + Send>;

/// Engine progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineProgress {
    /// Completion in percent, `[0, 100]`.
    pub percent: f64,

    /// Encoding speed in frames per second.
    pub current_fps: f64,

    /// Output position as `HH:MM:SS.cc`.
    pub timemark: String,
}

/// Cooperative cancellation flag shared between the caller and an engine.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How often the cancel watcher looks at the token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An external transcoding engine.
pub trait TranscodeEngine: Send + Sync {
    /// Execute the command, writing to `output`.
    fn execute(
        &self,
        command: &RenderCommand,
        output: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ClipforgeResult<PathBuf>;

    /// Check if this engine is available on the system.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}

/// Engine driving the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: String,
    stall_warning_secs: u64,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            stall_warning_secs: 10,
        }
    }

    pub fn with_stall_warning(mut self, secs: u64) -> Self {
        self.stall_warning_secs = secs.max(1);
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Version banner reported by `ffmpeg -version`.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.binary).arg("-version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        let raw = String::from_utf8(output.stdout).ok()?;
        raw.lines().next().map(|l| l.trim().to_string())
    }
}

/// Inputs made readable by the engine. Staged files are removed on drop.
struct StagedInputs {
    paths: Vec<PathBuf>,
    temp_dir: Option<PathBuf>,
}

impl StagedInputs {
    fn prepare(command: &RenderCommand) -> ClipforgeResult<Self> {
        let mut staged = Self {
            paths: Vec::with_capacity(command.inputs.len()),
            temp_dir: None,
        };
        for input in &command.inputs {
            match &input.source {
                AssetSource::File(path) => staged.paths.push(path.clone()),
                AssetSource::Bytes(bytes) => {
                    let dir = match &staged.temp_dir {
                        Some(dir) => dir.clone(),
                        None => {
                            let dir = std::env::temp_dir()
                                .join(format!("clipforge-render-{}", uuid::Uuid::new_v4()));
                            std::fs::create_dir_all(&dir)?;
                            staged.temp_dir = Some(dir.clone());
                            dir
                        }
                    };
                    let path = dir.join(&input.local_name);
                    std::fs::write(&path, bytes)?;
                    staged.paths.push(path);
                }
            }
        }
        Ok(staged)
    }
}

impl Drop for StagedInputs {
    fn drop(&mut self) {
        if let Some(dir) = &self.temp_dir {
            if let Err(err) = std::fs::remove_dir_all(dir) {
                tracing::warn!(error = %err, path = %dir.display(), "Failed to remove staged inputs");
            }
        }
    }
}

impl TranscodeEngine for FfmpegEngine {
    fn execute(
        &self,
        command: &RenderCommand,
        output: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ClipforgeResult<PathBuf> {
        let staged = StagedInputs::prepare(command)?;
        let args = command.to_ffmpeg_args(&staged.paths, output)?;
        let expected_duration_secs = command.encode_params.total_duration_secs;

        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.binary);
        cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ClipforgeError::render(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            inputs = command.inputs.len(),
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClipforgeError::render("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipforgeError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        // A silent ffmpeg leaves the reader blocked, so cancellation kills
        // the process from its own thread; the kill closes stdout.
        let child = Arc::new(Mutex::new(child));
        let finished = Arc::new(AtomicBool::new(false));
        let watcher =
            spawn_cancel_watcher(Arc::clone(&child), cancel.clone(), Arc::clone(&finished));

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = std::time::Instant::now();
        let mut cancelled = false;
        let mut read_error = None;
        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    read_error = Some(err);
                    break;
                }
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest.out_time_secs;
                last_progress_wall = std::time::Instant::now();
            }
            if let Some(cb) = &progress {
                cb(progress_report(&latest, expected_duration_secs));
            }
            if last_progress_wall.elapsed().as_secs() >= self.stall_warning_secs {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for {}s",
                    self.stall_warning_secs
                );
                last_progress_wall = std::time::Instant::now();
            }
        }

        finished.store(true, Ordering::SeqCst);
        let killed = watcher.join().unwrap_or(false);

        let mut child = lock_child(&child);
        if (cancelled || read_error.is_some()) && !killed {
            kill_child(&mut child);
        }
        let cancelled = cancelled || killed;
        let status = child
            .wait()
            .map_err(|e| ClipforgeError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        drop(child);

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if cancelled {
            tracing::info!(elapsed_secs = start.elapsed().as_secs_f64(), "ffmpeg cancelled");
            return Err(ClipforgeError::ExportCancelled);
        }
        if let Some(err) = read_error {
            return Err(ClipforgeError::render(format!(
                "Failed reading ffmpeg progress: {err}"
            )));
        }

        if !status.success() {
            let reason = stderr_output.trim();
            return Err(ClipforgeError::engine_failure(if reason.is_empty() {
                format!("ffmpeg exited with {status}")
            } else {
                reason.to_string()
            }));
        }

        if let Some(cb) = &progress {
            cb(EngineProgress {
                percent: 100.0,
                current_fps: latest.fps,
                timemark: format_timemark(expected_duration_secs),
            });
        }

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            output = %output.display(),
            "ffmpeg finished"
        );
        Ok(output.to_path_buf())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Watch `cancel` until `finished` is set, killing the child if it fires.
/// The handle yields whether the kill was issued.
fn spawn_cancel_watcher(
    child: Arc<Mutex<Child>>,
    cancel: CancelToken,
    finished: Arc<AtomicBool>,
) -> JoinHandle<bool> {
    std::thread::spawn(move || {
        while !finished.load(Ordering::SeqCst) {
            if cancel.is_cancelled() {
                kill_child(&mut lock_child(&child));
                return true;
            }
            std::thread::sleep(CANCEL_POLL_INTERVAL);
        }
        false
    })
}

fn lock_child(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn kill_child(child: &mut Child) {
    tracing::debug!(pid = child.id(), "Killing ffmpeg");
    if let Err(err) = child.kill() {
        tracing::warn!(error = %err, "Failed to kill ffmpeg");
    }
}

/// Whether `binary` resolves on `PATH` (or is an existing path).
pub fn command_exists(binary: &str) -> bool {
    if binary.contains('/') {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    fps: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse::<f64>() {
                    self.fps = fps;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, expected_duration_secs: f64) -> EngineProgress {
    let fraction = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    EngineProgress {
        percent: if state.complete { 100.0 } else { fraction * 100.0 },
        current_fps: state.fps,
        timemark: format_timemark(state.out_time_secs),
    }
}
