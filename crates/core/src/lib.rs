//! lessontrack core data models.
//!
//! This crate defines the data structures shared by the watch-progress
//! tracker, the persistence layer and the CLI.

#![warn(missing_docs)]

// Identities
mod id;

// Watch progress
mod range;
mod record;

// Lessons and player events
mod lesson;
mod event;

// Re-exports
pub use id::*;

pub use range::{WatchedRange, WatchedRanges, watched_percentage};
pub use record::{ProgressRecord, LessonCompletion};
pub use lesson::Lesson;
pub use event::PlayerEvent;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
