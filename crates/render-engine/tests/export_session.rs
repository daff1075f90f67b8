use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_project_model::{AssetRef, MediaClip, MediaKind, Timeline};
use clipforge_render_engine::{
    debug_report_path, CancelToken, CompileOptions, EngineProgress, ExportRequest, ExportSession,
    InMemoryAssetStore, ProgressCallback, RenderCommand, TranscodeEngine,
};

/// Records invocations and succeeds immediately.
#[derive(Default)]
struct RecordingEngine {
    calls: AtomicUsize,
    last_inputs: Mutex<Vec<String>>,
}

impl TranscodeEngine for RecordingEngine {
    fn execute(
        &self,
        command: &RenderCommand,
        output: &Path,
        progress: Option<ProgressCallback>,
        _cancel: &CancelToken,
    ) -> ClipforgeResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_inputs.lock().unwrap() =
            command.inputs.iter().map(|i| i.local_name.clone()).collect();
        if let Some(cb) = progress {
            cb(EngineProgress {
                percent: 100.0,
                current_fps: 30.0,
                timemark: "00:00:05.00".into(),
            });
        }
        Ok(output.to_path_buf())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Blocks inside `execute` until released.
struct GatedEngine {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl TranscodeEngine for GatedEngine {
    fn execute(
        &self,
        _command: &RenderCommand,
        output: &Path,
        _progress: Option<ProgressCallback>,
        _cancel: &CancelToken,
    ) -> ClipforgeResult<PathBuf> {
        self.started.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(output.to_path_buf())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// Spins until the token is cancelled.
struct CancellableEngine;

impl TranscodeEngine for CancellableEngine {
    fn execute(
        &self,
        _command: &RenderCommand,
        _output: &Path,
        _progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ClipforgeResult<PathBuf> {
        while !cancel.is_cancelled() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        Err(ClipforgeError::ExportCancelled)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "cancellable"
    }
}

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("clipforge_export_{}", uuid::Uuid::new_v4()))
}

fn one_clip_timeline(asset: &str) -> Timeline {
    let mut timeline = Timeline::new();
    timeline.clips.push(MediaClip::new(
        AssetRef::new(asset),
        MediaKind::Video,
        "clip.mp4",
        Some(5.0),
        0.0,
    ));
    timeline
}

fn assets_with(asset: &str) -> InMemoryAssetStore {
    let mut store = InMemoryAssetStore::new();
    store.insert_bytes(AssetRef::new(asset), "video/mp4", vec![0u8; 8], true);
    store
}

#[tokio::test]
async fn export_runs_engine_and_writes_debug_report() {
    let dir = scratch_dir();
    let output = dir.join("nested/out.mp4");
    let engine = Arc::new(RecordingEngine::default());
    let session = ExportSession::new(engine.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress: ProgressCallback = Box::new(move |p: EngineProgress| {
        sink.lock().unwrap().push(p.percent);
    });

    let result = session
        .export(
            &one_clip_timeline("a"),
            &assets_with("a"),
            ExportRequest::new(&output, CompileOptions::default()),
            Some(progress),
            CancelToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result, output);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*engine.last_inputs.lock().unwrap(), vec!["input0.mp4".to_string()]);
    assert_eq!(*seen.lock().unwrap(), vec![0.0, 100.0]);
    assert!(!session.is_busy());

    let report = std::fs::read_to_string(debug_report_path(&output)).unwrap();
    assert!(report.contains("inputs=1"));
    assert!(report.contains("filter_complex="));
    assert!(report.contains("-map [outa]"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn unresolved_asset_never_reaches_engine() {
    let dir = scratch_dir();
    let engine = Arc::new(RecordingEngine::default());
    let session = ExportSession::new(engine.clone());

    let err = session
        .export(
            &one_clip_timeline("missing"),
            &InMemoryAssetStore::new(),
            ExportRequest::new(dir.join("out.mp4"), CompileOptions::default()),
            None,
            CancelToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClipforgeError::Compile { .. }), "{err}");
    assert!(err.to_string().contains("missing"));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert!(!session.is_busy());
    assert!(!dir.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_export_is_rejected_while_busy() {
    let dir = scratch_dir();
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let engine = Arc::new(GatedEngine {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    });
    let session = Arc::new(ExportSession::new(engine));

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        let output = dir.join("first.mp4");
        async move {
            session
                .export(
                    &one_clip_timeline("a"),
                    &assets_with("a"),
                    ExportRequest::new(output, CompileOptions::default()),
                    None,
                    CancelToken::new(),
                )
                .await
        }
    });

    tokio::task::spawn_blocking(move || started_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(session.is_busy());

    let err = session
        .export(
            &one_clip_timeline("a"),
            &assets_with("a"),
            ExportRequest::new(dir.join("second.mp4"), CompileOptions::default()),
            None,
            CancelToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClipforgeError::ExportBusy));

    release_tx.send(()).unwrap();
    let path = first.await.unwrap().unwrap();
    assert_eq!(path, dir.join("first.mp4"));
    assert!(!session.is_busy());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_export_releases_session() {
    let dir = scratch_dir();
    let session = ExportSession::new(Arc::new(CancellableEngine));
    let cancel = CancelToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let mut request = ExportRequest::new(dir.join("out.mp4"), CompileOptions::default());
    request.write_debug_report = false;
    let err = session
        .export(&one_clip_timeline("a"), &assets_with("a"), request, None, cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ClipforgeError::ExportCancelled));
    assert!(!session.is_busy());
    assert!(!debug_report_path(&dir.join("out.mp4")).exists());

    std::fs::remove_dir_all(&dir).ok();
}
