//! Asset store: resolves the opaque asset handles carried by clips.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clipforge_project_model::{AssetRef, LoadedProject};

/// Where an asset's bytes live.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// A file the engine can read directly.
    File(PathBuf),
    /// In-memory bytes, staged to a temporary file before execution.
    Bytes(Arc<[u8]>),
}

/// A resolved asset.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub source: AssetSource,
    pub mime: String,
    /// Whether the asset carries an audio stream.
    pub has_audio: bool,
}

/// Resolves asset handles. `None` means the asset is unavailable.
pub trait AssetStore: Send + Sync {
    fn resolve(&self, asset_ref: &AssetRef) -> Option<ResolvedAsset>;
}

/// Asset store backed by a map, used for in-memory projects and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAssetStore {
    assets: HashMap<AssetRef, ResolvedAsset>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset_ref: AssetRef, asset: ResolvedAsset) {
        self.assets.insert(asset_ref, asset);
    }

    /// Register in-memory bytes under a handle.
    pub fn insert_bytes(
        &mut self,
        asset_ref: AssetRef,
        mime: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        has_audio: bool,
    ) {
        self.insert(
            asset_ref,
            ResolvedAsset {
                source: AssetSource::Bytes(bytes.into()),
                mime: mime.into(),
                has_audio,
            },
        );
    }
}

impl AssetStore for InMemoryAssetStore {
    fn resolve(&self, asset_ref: &AssetRef) -> Option<ResolvedAsset> {
        self.assets.get(asset_ref).cloned()
    }
}

/// Asset store reading the `sources/` files of a project on disk.
#[derive(Debug, Clone)]
pub struct ProjectAssetStore {
    root: PathBuf,
    records: Vec<clipforge_project_model::AssetRecord>,
}

impl ProjectAssetStore {
    pub fn new(project: &LoadedProject) -> Self {
        Self {
            root: project.root.clone(),
            records: project.project.assets.clone(),
        }
    }
}

impl AssetStore for ProjectAssetStore {
    fn resolve(&self, asset_ref: &AssetRef) -> Option<ResolvedAsset> {
        let record = self.records.iter().find(|r| &r.asset_ref == asset_ref)?;
        let path = self.root.join(&record.path);
        if !path.is_file() {
            tracing::warn!(asset = %asset_ref, path = %path.display(), "Asset file missing");
            return None;
        }
        Some(ResolvedAsset {
            source: AssetSource::File(path),
            mime: record.mime.clone(),
            has_audio: record.has_audio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_project_model::AssetRecord;

    #[test]
    fn test_in_memory_store_resolves_registered_assets() {
        let mut store = InMemoryAssetStore::new();
        store.insert_bytes(AssetRef::new("a"), "video/mp4", vec![0u8, 1, 2], true);
        let asset = store.resolve(&AssetRef::new("a")).unwrap();
        assert_eq!(asset.mime, "video/mp4");
        assert!(matches!(asset.source, AssetSource::Bytes(ref b) if b.len() == 3));
        assert!(store.resolve(&AssetRef::new("b")).is_none());
    }

    #[test]
    fn test_project_store_requires_file_on_disk() {
        let dir = std::env::temp_dir().join(format!("clipforge_assets_{}", uuid::Uuid::new_v4()));
        let mut project = LoadedProject::create(&dir, "Assets").unwrap();
        project.project.assets.push(AssetRecord {
            asset_ref: AssetRef::new("a1"),
            file_name: "clip.mp4".into(),
            path: "sources/a1.mp4".into(),
            mime: "video/mp4".into(),
            duration_secs: Some(3.0),
            has_audio: false,
        });

        let store = ProjectAssetStore::new(&project);
        assert!(store.resolve(&AssetRef::new("a1")).is_none());

        std::fs::write(dir.join("sources/a1.mp4"), b"fake").unwrap();
        let store = ProjectAssetStore::new(&project);
        let asset = store.resolve(&AssetRef::new("a1")).unwrap();
        assert!(matches!(asset.source, AssetSource::File(ref p) if p.ends_with("sources/a1.mp4")));

        std::fs::remove_dir_all(&dir).ok();
    }
}
