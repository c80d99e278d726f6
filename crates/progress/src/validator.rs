//! Authoritative completion validation.
//!
//! Client-reported percentages are spoofable, so completion is decided from
//! the watch data held by the store, never from what the tracker claims.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use lessontrack_core::{Lesson, LessonCompletion, SessionId, UserId};
use lessontrack_storage::{ProgressStore, StorageError};
use tracing::{debug, info};

use crate::config::TrackerConfig;

/// Errors that prevent a validation verdict.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Stored progress could not be read or the completion not written
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Validation service failed for another reason
    #[error("validation unavailable: {0}")]
    Unavailable(String),
}

/// Verdict of a completion check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the lesson may be marked complete
    pub is_valid: bool,
    /// Percentage measured by the validator
    pub watched_percentage: u8,
    /// Percentage required for completion
    pub required_percentage: u8,
}

/// Server-side authority on lesson completion.
#[async_trait]
pub trait CompletionValidator: Send + Sync {
    /// Check whether `user` has watched enough of `session`.
    async fn validate_completion(
        &self,
        user: UserId,
        session: SessionId,
        reported_duration_seconds: f64,
    ) -> Result<ValidationOutcome, ValidationError>;
}

/// Validator backed by the progress store.
///
/// The watched total is recomputed from the stored ranges. The denominator
/// is the largest of the reported duration, the stored one and the catalog
/// duration of the lesson (when registered), so neither a patched total nor
/// a shrunken duration can inflate the percentage. Accepted lessons are
/// recorded as a [`LessonCompletion`].
pub struct StoredProgressValidator {
    store: Arc<dyn ProgressStore>,
    threshold_percent: u8,
    lesson_durations: HashMap<SessionId, f64>,
}

impl StoredProgressValidator {
    /// Create a validator requiring `threshold_percent` (clamped to 100).
    pub fn new(store: Arc<dyn ProgressStore>, threshold_percent: u8) -> Self {
        Self {
            store,
            threshold_percent: threshold_percent.min(100),
            lesson_durations: HashMap::new(),
        }
    }

    /// Create a validator using the configured completion threshold.
    pub fn from_config(store: Arc<dyn ProgressStore>, config: &TrackerConfig) -> Self {
        Self::new(store, config.completion_threshold_percent)
    }

    /// Register the catalog duration of a lesson.
    pub fn with_lesson(mut self, lesson: &Lesson) -> Self {
        let seconds = lesson.estimated_duration_seconds();
        if seconds > 0.0 {
            self.lesson_durations.insert(lesson.id, seconds);
        }
        self
    }

    /// Required percentage.
    pub fn threshold_percent(&self) -> u8 {
        self.threshold_percent
    }
}

#[async_trait]
impl CompletionValidator for StoredProgressValidator {
    async fn validate_completion(
        &self,
        user: UserId,
        session: SessionId,
        reported_duration_seconds: f64,
    ) -> Result<ValidationOutcome, ValidationError> {
        let Some(record) = self.store.load_progress(user, session).await? else {
            debug!("No stored progress for {}/{}, rejecting completion", user, session);
            return Ok(ValidationOutcome {
                is_valid: false,
                watched_percentage: 0,
                required_percentage: self.threshold_percent,
            });
        };

        let reported = if reported_duration_seconds.is_finite() { reported_duration_seconds } else { 0.0 };
        let stored = if record.video_duration.is_finite() { record.video_duration } else { 0.0 };
        let catalog = self.lesson_durations.get(&session).copied().unwrap_or(0.0);
        let duration = reported.max(stored).max(catalog);

        let watched_percentage = record.watched_percentage(duration);
        let is_valid = duration > 0.0 && watched_percentage >= self.threshold_percent;

        if is_valid {
            self.store
                .save_completion(&LessonCompletion::new(user, session, watched_percentage))
                .await?;
            info!("Lesson {} completed by {} ({}%)", session, user, watched_percentage);
        } else {
            debug!(
                "Completion of {} by {} rejected: {}% < {}%",
                session, user, watched_percentage, self.threshold_percent
            );
        }

        Ok(ValidationOutcome {
            is_valid,
            watched_percentage,
            required_percentage: self.threshold_percent,
        })
    }
}
