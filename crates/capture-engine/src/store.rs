//! Storage for published videos, their sidecar objects, and overlay presets.

use std::path::{Component, Path, PathBuf};

use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{generate_id, OverlayPreset, StoredVideo};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

/// Object and record storage used when publishing an export.
///
/// Failures surface as `Storage` errors and never touch export state.
#[async_trait::async_trait]
pub trait VideoStore: Send + Sync {
    /// Store `bytes` under `path` and return a URL for it.
    async fn upload(&self, bytes: Vec<u8>, path: &str, content_type: &str)
        -> NewscutResult<String>;

    /// Insert a record, assigning an id when it has none.
    async fn insert_video(&self, video: StoredVideo) -> NewscutResult<StoredVideo>;

    /// Newest first.
    async fn list_videos(&self) -> NewscutResult<Vec<StoredVideo>>;

    async fn delete_video(&self, id: &str) -> NewscutResult<()>;

    async fn save_preset(&self, preset: OverlayPreset) -> NewscutResult<OverlayPreset>;

    async fn list_presets(&self) -> NewscutResult<Vec<OverlayPreset>>;

    async fn delete_preset(&self, id: &str) -> NewscutResult<()>;
}

const VIDEOS_FILE: &str = "videos.json";
const PRESETS_FILE: &str = "presets.json";
const OBJECTS_DIR: &str = "objects";

/// Filesystem store: objects under `<root>/objects`, records as JSON arrays.
#[derive(Debug)]
pub struct LocalVideoStore {
    root: PathBuf,
    // Serializes read-modify-write of the record files.
    records: Mutex<()>,
}

impl LocalVideoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            records: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &str) -> NewscutResult<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(NewscutError::storage(format!("Invalid object path: {path}")));
        }
        Ok(self.root.join(OBJECTS_DIR).join(relative))
    }

    async fn read_records<T: DeserializeOwned>(&self, name: &str) -> NewscutResult<Vec<T>> {
        let path = self.root.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                NewscutError::storage(format!("Corrupt record file {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(NewscutError::storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn write_records<T: Serialize + Sync>(
        &self,
        name: &str,
        records: &[T],
    ) -> NewscutResult<()> {
        let path = self.root.join(name);
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| NewscutError::storage(format!("Failed to create store: {e}")))?;
        let json = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&path, json).await.map_err(|e| {
            NewscutError::storage(format!("Failed to write {}: {e}", path.display()))
        })
    }
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[async_trait::async_trait]
impl VideoStore for LocalVideoStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        path: &str,
        content_type: &str,
    ) -> NewscutResult<String> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                NewscutError::storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let size = bytes.len();
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| NewscutError::storage(format!("Failed to upload {path}: {e}")))?;
        tracing::info!(path, content_type, bytes = size, "Object stored");
        Ok(file_url(&target))
    }

    async fn insert_video(&self, mut video: StoredVideo) -> NewscutResult<StoredVideo> {
        let _guard = self.records.lock().await;
        let mut videos: Vec<StoredVideo> = self.read_records(VIDEOS_FILE).await?;
        if video.id.is_empty() {
            video.id = generate_id();
        }
        if videos.iter().any(|v| v.id == video.id) {
            return Err(NewscutError::storage(format!(
                "Video {} already exists",
                video.id
            )));
        }
        videos.push(video.clone());
        self.write_records(VIDEOS_FILE, &videos).await?;
        tracing::info!(id = %video.id, title = %video.title, "Video record inserted");
        Ok(video)
    }

    async fn list_videos(&self) -> NewscutResult<Vec<StoredVideo>> {
        let mut videos: Vec<StoredVideo> = self.read_records(VIDEOS_FILE).await?;
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn delete_video(&self, id: &str) -> NewscutResult<()> {
        let _guard = self.records.lock().await;
        let mut videos: Vec<StoredVideo> = self.read_records(VIDEOS_FILE).await?;
        let before = videos.len();
        videos.retain(|v| v.id != id);
        if videos.len() == before {
            return Err(NewscutError::storage(format!("No video with id {id}")));
        }
        self.write_records(VIDEOS_FILE, &videos).await?;
        tracing::info!(id, "Video record deleted");
        Ok(())
    }

    async fn save_preset(&self, mut preset: OverlayPreset) -> NewscutResult<OverlayPreset> {
        let _guard = self.records.lock().await;
        let mut presets: Vec<OverlayPreset> = self.read_records(PRESETS_FILE).await?;
        if preset.id.is_empty() {
            preset.id = generate_id();
        }
        match presets.iter_mut().find(|p| p.id == preset.id) {
            Some(existing) => *existing = preset.clone(),
            None => presets.push(preset.clone()),
        }
        self.write_records(PRESETS_FILE, &presets).await?;
        tracing::info!(id = %preset.id, name = %preset.name, "Overlay preset saved");
        Ok(preset)
    }

    async fn list_presets(&self) -> NewscutResult<Vec<OverlayPreset>> {
        let mut presets: Vec<OverlayPreset> = self.read_records(PRESETS_FILE).await?;
        presets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(presets)
    }

    async fn delete_preset(&self, id: &str) -> NewscutResult<()> {
        let _guard = self.records.lock().await;
        let mut presets: Vec<OverlayPreset> = self.read_records(PRESETS_FILE).await?;
        let before = presets.len();
        presets.retain(|p| p.id != id);
        if presets.len() == before {
            return Err(NewscutError::storage(format!("No preset with id {id}")));
        }
        self.write_records(PRESETS_FILE, &presets).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newscut_project_model::{OverlaySettings, TemplateId, VideoStatus};

    fn video(id: &str, created_at: &str) -> StoredVideo {
        StoredVideo {
            id: id.to_string(),
            title: format!("Story {id}"),
            video_url: "file:///tmp/v.webm".to_string(),
            audio_url: None,
            subtitle_url: None,
            duration_secs: 10.0,
            template: TemplateId::Headline,
            voice: None,
            status: VideoStatus::Ready,
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_writes_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVideoStore::new(dir.path());
        let url = store
            .upload(b"srt".to_vec(), "subtitles/a.srt", "application/x-subrip")
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        let stored = dir.path().join("objects/subtitles/a.srt");
        assert_eq!(std::fs::read(stored).unwrap(), b"srt");
    }

    #[tokio::test]
    async fn test_upload_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVideoStore::new(dir.path());
        for path in ["../x", "/etc/passwd", "", "a/../../b"] {
            let err = store.upload(vec![1], path, "video/webm").await.unwrap_err();
            assert!(matches!(err, NewscutError::Storage { .. }), "{path}");
        }
    }

    #[tokio::test]
    async fn test_video_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVideoStore::new(dir.path());
        assert!(store.list_videos().await.unwrap().is_empty());

        let first = store
            .insert_video(video("", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert!(!first.id.is_empty());
        store
            .insert_video(video("b", "2024-02-01T00:00:00Z"))
            .await
            .unwrap();
        assert!(store
            .insert_video(video("b", "2024-03-01T00:00:00Z"))
            .await
            .is_err());

        let listed = store.list_videos().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "b");

        store.delete_video("b").await.unwrap();
        assert!(store.delete_video("b").await.is_err());
        assert_eq!(store.list_videos().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_presets_upsert_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVideoStore::new(dir.path());
        let mut preset = store
            .save_preset(OverlayPreset::new("Evening", OverlaySettings::default()))
            .await
            .unwrap();
        preset.name = "Late".to_string();
        store.save_preset(preset.clone()).await.unwrap();

        let presets = store.list_presets().await.unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].name, "Late");

        store.delete_preset(&preset.id).await.unwrap();
        assert!(store.list_presets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_records_are_storage_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VIDEOS_FILE), b"not json").unwrap();
        let store = LocalVideoStore::new(dir.path());
        let err = store.list_videos().await.unwrap_err();
        assert!(err.is_recoverable());
    }
}
