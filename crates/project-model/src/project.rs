//! Project metadata, export settings and on-disk persistence.
//!
//! A project is the top-level container that ties together imported assets,
//! the editing timeline, and export configuration.
//!
//! ```text
//! <root>/
//!   meta/project.json
//!   meta/timeline.json
//!   sources/<asset>.<ext>
//!   exports/
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::AssetRecord;
use crate::asset::AssetRef;
use crate::sanitize;
use crate::timeline::Timeline;

/// Top-level project file (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier.
    pub id: uuid::Uuid,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    /// Imported media.
    #[serde(default)]
    pub assets: Vec<AssetRecord>,

    /// Export configuration.
    #[serde(default)]
    pub export: ExportSettings,
}

/// Encoding quality. Maps to an x264 CRF value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl ExportQuality {
    pub fn crf(self) -> u8 {
        match self {
            Self::Low => 28,
            Self::Medium => 23,
            Self::High => 20,
            Self::Ultra => 18,
        }
    }
}

/// Encoding speed. Maps to an x264 preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportSpeed {
    Fastest,
    Fast,
    #[default]
    Balanced,
    Slow,
}

impl ExportSpeed {
    pub fn preset(self) -> &'static str {
        match self {
            Self::Fastest => "ultrafast",
            Self::Fast => "veryfast",
            Self::Balanced => "medium",
            Self::Slow => "slow",
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub quality: ExportQuality,
    pub speed: ExportSpeed,
    /// AAC bitrate in kbps.
    pub audio_bitrate_kbps: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            quality: ExportQuality::default(),
            speed: ExportSpeed::default(),
            audio_bitrate_kbps: 192,
        }
    }
}

/// The complete in-memory representation of a loaded project.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// Project metadata.
    pub project: Project,

    /// Editing timeline.
    pub timeline: Timeline,
}

impl Project {
    /// Create a new project with defaults.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: "1.0".to_string(),
            name: name.into(),
            id: uuid::Uuid::new_v4(),
            created_at: now,
            modified_at: now,
            assets: vec![],
            export: ExportSettings::default(),
        }
    }

    pub fn asset(&self, asset_ref: &AssetRef) -> Option<&AssetRecord> {
        self.assets.iter().find(|a| &a.asset_ref == asset_ref)
    }
}

impl LoadedProject {
    /// Load a project from a directory. The timeline is sanitized on load.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        let project_path = root.join("meta").join("project.json");
        let timeline_path = root.join("meta").join("timeline.json");

        let project_json =
            std::fs::read_to_string(&project_path).map_err(|e| ProjectError::IoError {
                path: project_path.clone(),
                source: e,
            })?;

        let project: Project =
            serde_json::from_str(&project_json).map_err(|e| ProjectError::ParseError {
                path: project_path,
                source: e,
            })?;

        let timeline = if timeline_path.exists() {
            let timeline_json =
                std::fs::read_to_string(&timeline_path).map_err(|e| ProjectError::IoError {
                    path: timeline_path.clone(),
                    source: e,
                })?;
            sanitize::timeline_from_json(&timeline_json).map_err(|e| ProjectError::ParseError {
                path: timeline_path,
                source: e,
            })?
        } else {
            Timeline::new()
        };

        Ok(Self {
            root,
            project,
            timeline,
        })
    }

    /// Save project and timeline to disk, bumping the modification time.
    pub fn save(&mut self) -> Result<(), ProjectError> {
        self.project.modified_at = Utc::now();
        self.write_meta()
    }

    fn write_meta(&self) -> Result<(), ProjectError> {
        let meta_dir = self.root.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(|e| ProjectError::IoError {
            path: meta_dir.clone(),
            source: e,
        })?;

        write_json(&meta_dir.join("project.json"), &self.project)?;
        write_json(&meta_dir.join("timeline.json"), &self.timeline)
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(root: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["sources", "meta", "exports"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let loaded = Self {
            root,
            project: Project::new(name),
            timeline: Timeline::new(),
        };
        loaded.write_meta()?;
        Ok(loaded)
    }

    /// Absolute path of an asset's stored copy.
    pub fn asset_path(&self, asset: &AssetRecord) -> PathBuf {
        self.root.join(&asset.path)
    }

    /// Check that assets exist on disk and every clip references a known asset.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        for asset in &self.project.assets {
            if !self.asset_path(asset).exists() {
                errors.push(format!(
                    "Asset {} source missing: {}",
                    asset.file_name, asset.path
                ));
            }
        }

        for clip in &self.timeline.clips {
            if self.project.asset(&clip.asset_ref).is_none() {
                errors.push(format!(
                    "Clip {} references unknown asset {}",
                    clip.id.short(),
                    clip.asset_ref
                ));
            }
        }

        errors
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ProjectError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

impl From<ProjectError> for clipforge_common::ClipforgeError {
    fn from(err: ProjectError) -> Self {
        Self::project(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{MediaClip, MediaKind};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clipforge_{name}_{}", uuid::Uuid::new_v4()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_quality_and_speed_presets() {
        assert_eq!(ExportQuality::Low.crf(), 28);
        assert_eq!(ExportQuality::Medium.crf(), 23);
        assert_eq!(ExportQuality::High.crf(), 20);
        assert_eq!(ExportQuality::Ultra.crf(), 18);
        assert_eq!(ExportSpeed::Fastest.preset(), "ultrafast");
        assert_eq!(ExportSpeed::Balanced.preset(), "medium");
    }

    #[test]
    fn test_project_serialization() {
        let project = Project::new("Test");
        let json = serde_json::to_string_pretty(&project).unwrap();
        let parsed: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "Test");
        assert_eq!(parsed.id, project.id);
        assert_eq!(parsed.export, ExportSettings::default());
    }

    #[test]
    fn test_loaded_project_create_and_load() {
        let dir = temp_dir("create");

        let mut created = LoadedProject::create(&dir, "Integration Test").unwrap();
        assert!(dir.join("sources").is_dir());
        created.timeline.clips.push(MediaClip::new(
            AssetRef::new("a"),
            MediaKind::Video,
            "a.mp4",
            Some(5.0),
            0.0,
        ));
        created.save().unwrap();

        let loaded = LoadedProject::load(&dir).unwrap();
        assert_eq!(loaded.project.name, "Integration Test");
        assert_eq!(loaded.timeline.version, "1.0");
        assert_eq!(loaded.timeline.clips, created.timeline.clips);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_sources_reports_missing() {
        let dir = temp_dir("validate");

        let mut loaded = LoadedProject::create(&dir, "Validate Test").unwrap();
        loaded.project.assets.push(AssetRecord {
            asset_ref: AssetRef::new("a1"),
            file_name: "intro.mp4".to_string(),
            path: "sources/a1.mp4".to_string(),
            mime: "video/mp4".to_string(),
            duration_secs: Some(12.0),
            has_audio: true,
        });
        loaded.timeline.clips.push(MediaClip::new(
            AssetRef::new("ghost"),
            MediaKind::Audio,
            "ghost.mp3",
            None,
            0.0,
        ));

        let errors = loaded.validate_sources();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("intro.mp4 source missing")));
        assert!(errors.iter().any(|e| e.contains("unknown asset ghost")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_project_is_io_error() {
        let dir = temp_dir("missing");
        let err = LoadedProject::load(&dir).unwrap_err();
        assert!(matches!(err, ProjectError::IoError { .. }));
    }
}
