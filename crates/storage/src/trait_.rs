//! Storage trait abstraction.

use async_trait::async_trait;
use lessontrack_core::{LessonCompletion, ProgressRecord, SessionId, UserId};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend temporarily unreachable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Persistence for watch progress and lesson completions.
///
/// Implementations are shared between the tracker, its autosave task and
/// the validator, so every method takes `&self`.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    // === Progress operations ===

    /// Load the progress of `user` on `session`.
    async fn load_progress(&self, user: UserId, session: SessionId) -> Result<Option<ProgressRecord>>;

    /// Upsert a progress record keyed by `(user_id, session_id)`.
    async fn save_progress(&self, record: &ProgressRecord) -> Result<()>;

    /// List every progress record of `user`.
    async fn list_progress(&self, user: UserId) -> Result<Vec<ProgressRecord>>;

    // === Completion operations ===

    /// Record a validated completion.
    async fn save_completion(&self, completion: &LessonCompletion) -> Result<()>;

    /// Load the completion of `user` on `session`.
    async fn load_completion(&self, user: UserId, session: SessionId) -> Result<Option<LessonCompletion>>;
}
