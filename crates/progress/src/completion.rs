//! "Mark complete" flow.
//!
//! The tracker feeds the validator but never certifies completion itself:
//! local completed state only changes from a validator verdict.

use lessontrack_core::{SessionId, UserId};
use tracing::warn;

use crate::notify::{Notice, Notifier};
use crate::tracker::ProgressTracker;
use crate::validator::CompletionValidator;

/// Result of asking to mark a lesson complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Validator accepted the lesson
    Completed {
        /// Percentage the validator measured
        watched_percentage: u8,
    },
    /// Validator found too little watched
    Rejected {
        /// Percentage the validator measured
        watched_percentage: u8,
        /// Percentage it requires
        required_percentage: u8,
    },
    /// No verdict could be obtained
    Unavailable,
}

impl CompletionOutcome {
    /// Whether the lesson is now complete.
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionOutcome::Completed { .. })
    }
}

/// Local "completed" flag of a lesson view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionState {
    completed: bool,
}

impl CompletionState {
    /// Fold in a validator verdict. A completed lesson stays completed.
    pub fn apply(&mut self, outcome: CompletionOutcome) {
        if outcome.is_completed() {
            self.completed = true;
        }
    }

    /// Whether the validator has accepted the lesson.
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Run the completion flow for the tracker's lesson.
///
/// 1. force a save so the validator sees the latest ranges
/// 2. ask the validator, passing the tracker's duration
/// 3. report the verdict through the tracker's notifier
///
/// Playback is never touched, whatever the verdict.
pub async fn complete_lesson(
    tracker: &mut ProgressTracker,
    validator: &dyn CompletionValidator,
) -> CompletionOutcome {
    if !tracker.save_progress().await {
        warn!("Pre-validation save failed; validating against previously stored progress");
    }

    let notifier = tracker.notifier();
    request_completion(
        validator,
        tracker.state().user_id,
        tracker.state().session_id,
        tracker.video_duration(),
        notifier.as_ref(),
    )
    .await
}

/// Ask the validator for a verdict and report it through `notifier`.
///
/// Needs no tracker, so callers sharing one behind a lock can run the
/// validation I/O without holding it.
pub async fn request_completion(
    validator: &dyn CompletionValidator,
    user: UserId,
    session: SessionId,
    reported_duration_seconds: f64,
    notifier: &dyn Notifier,
) -> CompletionOutcome {
    match validator
        .validate_completion(user, session, reported_duration_seconds)
        .await
    {
        Ok(outcome) if outcome.is_valid => {
            notifier.notify(Notice::CompletionConfirmed {
                watched_percentage: outcome.watched_percentage,
            });
            CompletionOutcome::Completed {
                watched_percentage: outcome.watched_percentage,
            }
        }
        Ok(outcome) => {
            notifier.notify(Notice::CompletionRejected {
                watched_percentage: outcome.watched_percentage,
                required_percentage: outcome.required_percentage,
            });
            CompletionOutcome::Rejected {
                watched_percentage: outcome.watched_percentage,
                required_percentage: outcome.required_percentage,
            }
        }
        Err(e) => {
            warn!("Completion validation for {}/{} failed: {}", user, session, e);
            notifier.notify(Notice::CompletionUnavailable);
            CompletionOutcome::Unavailable
        }
    }
}
