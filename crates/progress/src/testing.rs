//! Test doubles shared by the unit tests of this crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use lessontrack_core::{LessonCompletion, ProgressRecord, SessionId, UserId};
use lessontrack_storage::{ProgressStore, Result, StorageError};
use crate::notify::{Notice, Notifier};

/// Store that records every save and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    pub seed: Mutex<Option<ProgressRecord>>,
    pub saves: Mutex<Vec<ProgressRecord>>,
    pub completions: Mutex<Vec<LessonCompletion>>,
    pub fail_loads: AtomicBool,
    pub fail_saves: AtomicBool,
    pub loads: AtomicUsize,
    /// Holds the next save this long before it lands
    pub next_save_delay: Mutex<Option<Duration>>,
}

impl RecordingStore {
    pub fn with_seed(record: ProgressRecord) -> Self {
        let store = Self::default();
        *store.seed.lock().unwrap() = Some(record);
        store
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_save(&self) -> Option<ProgressRecord> {
        self.saves.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ProgressStore for RecordingStore {
    async fn load_progress(&self, _user: UserId, _session: SessionId) -> Result<Option<ProgressRecord>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("load refused".into()));
        }
        if let Some(last) = self.last_save() {
            return Ok(Some(last));
        }
        Ok(self.seed.lock().unwrap().clone())
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<()> {
        let delay = self.next_save_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("save refused".into()));
        }
        self.saves.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn list_progress(&self, user: UserId) -> Result<Vec<ProgressRecord>> {
        Ok(self.last_save().into_iter().filter(|r| r.user_id == user).collect())
    }

    async fn save_completion(&self, completion: &LessonCompletion) -> Result<()> {
        self.completions.lock().unwrap().push(completion.clone());
        Ok(())
    }

    async fn load_completion(&self, user: UserId, session: SessionId) -> Result<Option<LessonCompletion>> {
        Ok(self
            .completions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.user_id == user && c.session_id == session)
            .cloned())
    }
}

/// Notifier that keeps every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn skip_count(&self) -> usize {
        self.notices()
            .iter()
            .filter(|n| matches!(n, Notice::SkippingDetected { .. }))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}
