//! In-memory storage implementation.

use std::collections::HashMap;
use async_trait::async_trait;
use lessontrack_core::{LessonCompletion, ProgressRecord, SessionId, UserId};
use tokio::sync::Mutex;
use super::{ProgressStore, Result};

/// Volatile storage backend, mainly for tests and embedding.
#[derive(Default)]
pub struct MemoryStorage {
    progress: Mutex<HashMap<(UserId, SessionId), ProgressRecord>>,
    completions: Mutex<HashMap<(UserId, SessionId), LessonCompletion>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryStorage {
    async fn load_progress(&self, user: UserId, session: SessionId) -> Result<Option<ProgressRecord>> {
        Ok(self.progress.lock().await.get(&(user, session)).cloned())
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<()> {
        self.progress
            .lock()
            .await
            .insert((record.user_id, record.session_id), record.clone());
        Ok(())
    }

    async fn list_progress(&self, user: UserId) -> Result<Vec<ProgressRecord>> {
        let mut records: Vec<_> = self
            .progress
            .lock()
            .await
            .values()
            .filter(|r| r.user_id == user)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(records)
    }

    async fn save_completion(&self, completion: &LessonCompletion) -> Result<()> {
        self.completions
            .lock()
            .await
            .insert((completion.user_id, completion.session_id), completion.clone());
        Ok(())
    }

    async fn load_completion(&self, user: UserId, session: SessionId) -> Result<Option<LessonCompletion>> {
        Ok(self.completions.lock().await.get(&(user, session)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessontrack_core::WatchedRanges;

    #[tokio::test]
    async fn test_last_write_wins() {
        let storage = MemoryStorage::new();
        let user = UserId::new();
        let session = SessionId::new();

        let mut first = ProgressRecord::new(user, session, WatchedRanges::new(), 60.0);
        first.total_watched_seconds = 10;
        let mut second = first.clone();
        second.total_watched_seconds = 20;

        storage.save_progress(&first).await.unwrap();
        storage.save_progress(&second).await.unwrap();

        let loaded = storage.load_progress(user, session).await.unwrap().unwrap();
        assert_eq!(loaded.total_watched_seconds, 20);
        assert_eq!(storage.list_progress(user).await.unwrap().len(), 1);
    }
}
