//! Video watch progress tracking.
//!
//! Converts player events into deduplicated watched ranges, persists them
//! periodically, and gates lesson completion on an external validator.

#![warn(missing_docs)]

pub mod config;
pub mod notify;
pub mod tracker;
pub mod adapter;
pub mod validator;
pub mod completion;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{TrackerConfig, ConfigError};
pub use notify::{Notice, Notifier, LogNotifier, ChannelNotifier};
pub use tracker::{ProgressTracker, ProgressState, ProgressData, SavePayload};
pub use adapter::{VideoPlayer, ReplayPlayer, dispatch};
pub use validator::{CompletionValidator, StoredProgressValidator, ValidationOutcome, ValidationError};
pub use completion::{complete_lesson, request_completion, CompletionOutcome, CompletionState};
pub use session::{LessonSession, LessonSwitcher};
