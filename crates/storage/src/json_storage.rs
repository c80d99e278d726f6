//! JSON file storage implementation.
//!
//! Stores one JSON file per `(user, lesson)` pair and keeps small per-object
//! meta markers (version + updated_at) next to the data.

use std::path::{Path, PathBuf};
use lessontrack_core::{LessonCompletion, ProgressRecord, SessionId, UserId};
use super::{ProgressStore, Result};
use tokio::fs;
use tracing::debug;

/// File-based JSON storage backend.
///
/// Layout under the root directory:
/// ```text
/// progress/<user>/<session>.json
/// completions/<user>/<session>.json
/// meta/<kind>/<user>/<session>.meta.json
/// ```
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the top-level directories.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("progress")).await?;
        fs::create_dir_all(root.join("completions")).await?;
        fs::create_dir_all(root.join("meta").join("progress")).await?;
        fs::create_dir_all(root.join("meta").join("completions")).await?;

        Ok(Self { root })
    }

    fn progress_path(&self, user: UserId, session: SessionId) -> PathBuf {
        self.root.join("progress").join(user.to_string()).join(format!("{}.json", session))
    }

    fn completion_path(&self, user: UserId, session: SessionId) -> PathBuf {
        self.root.join("completions").join(user.to_string()).join(format!("{}.json", session))
    }

    fn meta_path(&self, kind: &str, user: UserId, session: SessionId) -> PathBuf {
        self.root
            .join("meta")
            .join(kind)
            .join(user.to_string())
            .join(format!("{}.meta.json", session))
    }

    /// Read and increment per-object version, return new version.
    async fn bump_version(&self, kind: &str, user: UserId, session: SessionId) -> Result<u64> {
        let path = self.meta_path(kind, user, session);
        let mut version = 0u64;
        if let Ok(s) = fs::read_to_string(&path).await {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&s) {
                if let Some(v) = json.get("version").and_then(|v| v.as_u64()) {
                    version = v;
                }
            }
        }
        version += 1;
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        write_json(&path, &meta).await?;
        Ok(version)
    }

    /// Current version marker of a progress record, 0 if never written.
    pub async fn progress_version(&self, user: UserId, session: SessionId) -> Result<u64> {
        let meta: Option<serde_json::Value> = read_json(&self.meta_path("progress", user, session)).await?;
        Ok(meta
            .and_then(|m| m.get("version").and_then(|v| v.as_u64()))
            .unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl ProgressStore for JsonStorage {
    async fn load_progress(&self, user: UserId, session: SessionId) -> Result<Option<ProgressRecord>> {
        read_json(&self.progress_path(user, session)).await
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<()> {
        let path = self.progress_path(record.user_id, record.session_id);
        write_json(&path, record).await?;

        let version = self.bump_version("progress", record.user_id, record.session_id).await?;
        debug!(
            "Saved progress {}/{} v{} ({}s watched)",
            record.user_id, record.session_id, version, record.total_watched_seconds
        );
        Ok(())
    }

    async fn list_progress(&self, user: UserId) -> Result<Vec<ProgressRecord>> {
        let mut records: Vec<ProgressRecord> =
            list_dir(&self.root.join("progress").join(user.to_string())).await?;
        records.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(records)
    }

    async fn save_completion(&self, completion: &LessonCompletion) -> Result<()> {
        let path = self.completion_path(completion.user_id, completion.session_id);
        write_json(&path, completion).await?;

        self.bump_version("completions", completion.user_id, completion.session_id).await?;
        Ok(())
    }

    async fn load_completion(&self, user: UserId, session: SessionId) -> Result<Option<LessonCompletion>> {
        read_json(&self.completion_path(user, session)).await
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json.as_bytes()).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessontrack_core::{WatchedRange, WatchedRanges};

    fn record(user: UserId, session: SessionId, ranges: &[(f64, f64)]) -> ProgressRecord {
        let ranges = WatchedRanges::from_ranges(
            ranges.iter().filter_map(|&(s, e)| WatchedRange::new(s, e)),
        );
        ProgressRecord::new(user, session, ranges, 100.0)
    }

    #[tokio::test]
    async fn test_progress_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let user = UserId::new();
        let session = SessionId::new();

        assert!(storage.load_progress(user, session).await.unwrap().is_none());

        let saved = record(user, session, &[(0.0, 30.0), (40.0, 60.0)]);
        storage.save_progress(&saved).await.unwrap();

        let loaded = storage.load_progress(user, session).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.total_watched_seconds, 50);
    }

    #[tokio::test]
    async fn test_save_is_upsert_and_bumps_version() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let user = UserId::new();
        let session = SessionId::new();

        storage.save_progress(&record(user, session, &[(0.0, 10.0)])).await.unwrap();
        storage.save_progress(&record(user, session, &[(0.0, 20.0)])).await.unwrap();

        let loaded = storage.load_progress(user, session).await.unwrap().unwrap();
        assert_eq!(loaded.total_watched_seconds, 20);
        assert_eq!(storage.progress_version(user, session).await.unwrap(), 2);
        assert_eq!(storage.list_progress(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_progress_scoped_to_user() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let alice = UserId::new();
        let bob = UserId::new();

        storage.save_progress(&record(alice, SessionId::new(), &[(0.0, 10.0)])).await.unwrap();
        storage.save_progress(&record(alice, SessionId::new(), &[(0.0, 5.0)])).await.unwrap();
        storage.save_progress(&record(bob, SessionId::new(), &[(0.0, 5.0)])).await.unwrap();

        assert_eq!(storage.list_progress(alice).await.unwrap().len(), 2);
        assert_eq!(storage.list_progress(bob).await.unwrap().len(), 1);
        assert!(storage.list_progress(UserId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completion_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let user = UserId::new();
        let session = SessionId::new();

        assert!(storage.load_completion(user, session).await.unwrap().is_none());

        let completion = LessonCompletion::new(user, session, 92);
        storage.save_completion(&completion).await.unwrap();
        let loaded = storage.load_completion(user, session).await.unwrap().unwrap();
        assert_eq!(loaded.watched_percentage, 92);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let user = UserId::new();
        let session = SessionId::new();

        let path = storage.progress_path(user, session);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        assert!(storage.load_progress(user, session).await.is_err());
    }
}
