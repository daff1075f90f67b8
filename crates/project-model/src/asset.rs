//! Imported media assets and MIME classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clip::MediaKind;

/// Opaque handle into the asset store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random handle.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An asset imported into a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Handle used by clips to reference this asset.
    pub asset_ref: AssetRef,

    /// Original file name, used as the clip display label.
    pub file_name: String,

    /// Path of the stored copy, relative to the project root.
    pub path: String,

    /// MIME type (e.g. `video/mp4`).
    pub mime: String,

    /// Probed media length in seconds. `None` for stills or when probing failed.
    #[serde(default)]
    pub duration_secs: Option<f64>,

    /// Whether the asset carries an audio stream.
    #[serde(default)]
    pub has_audio: bool,
}

impl AssetRecord {
    /// Media kind derived from the MIME type.
    pub fn kind(&self) -> Option<MediaKind> {
        kind_for_mime(&self.mime)
    }
}

/// MIME types the editor can import, with their container extension.
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
    ("video/webm", "webm"),
    ("video/x-msvideo", "avi"),
    ("video/x-matroska", "mkv"),
    ("audio/mpeg", "mp3"),
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/aac", "aac"),
    ("audio/mp4", "m4a"),
    ("audio/x-m4a", "m4a"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// File extension for a supported MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = normalize_mime(mime);
    MIME_EXTENSIONS
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
}

/// MIME type for a file extension (case-insensitive).
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    let ext = match ext.as_str() {
        "jpeg" => "jpg",
        other => other,
    };
    MIME_EXTENSIONS
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(m, _)| *m)
}

/// Media kind for a supported MIME type.
pub fn kind_for_mime(mime: &str) -> Option<MediaKind> {
    extension_for_mime(mime)?;
    let mime = normalize_mime(mime);
    if mime.starts_with("video/") {
        Some(MediaKind::Video)
    } else if mime.starts_with("audio/") {
        Some(MediaKind::Audio)
    } else if mime.starts_with("image/") {
        Some(MediaKind::Image)
    } else {
        None
    }
}
