//! Persisted progress and completion records.

use crate::id::{SessionId, UserId};
use crate::range::{watched_percentage, WatchedRanges};
use crate::Time;
use serde::{Deserialize, Serialize};

/// The persisted watch progress of one learner on one lesson.
///
/// Records are full snapshots keyed by `(user_id, session_id)`, so the last
/// write always wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Learner
    pub user_id: UserId,

    /// Lesson
    pub session_id: SessionId,

    /// Normalized watched ranges
    pub watched_ranges: WatchedRanges,

    /// Sum of range lengths, rounded to the nearest second
    pub total_watched_seconds: u64,

    /// Duration known to the client when the record was written
    #[serde(default)]
    pub video_duration: f64,

    /// Last write
    pub updated_at: Time,
}

impl ProgressRecord {
    /// Create a record from a range set, deriving the rounded total.
    pub fn new(
        user_id: UserId,
        session_id: SessionId,
        watched_ranges: WatchedRanges,
        video_duration: f64,
    ) -> Self {
        let total_watched_seconds = watched_ranges.total_seconds().round() as u64;
        Self {
            user_id,
            session_id,
            watched_ranges,
            total_watched_seconds,
            video_duration,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Percentage computed from the stored ranges, not the stored total.
    pub fn watched_percentage(&self, duration_seconds: f64) -> u8 {
        watched_percentage(self.watched_ranges.total_seconds(), duration_seconds)
    }
}

/// A lesson the validator has accepted as complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonCompletion {
    /// Learner
    pub user_id: UserId,

    /// Lesson
    pub session_id: SessionId,

    /// Percentage at the time of validation
    pub watched_percentage: u8,

    /// When validation succeeded
    pub completed_at: Time,
}

impl LessonCompletion {
    /// Create a completion stamped now.
    pub fn new(user_id: UserId, session_id: SessionId, watched_percentage: u8) -> Self {
        Self {
            user_id,
            session_id,
            watched_percentage,
            completed_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::WatchedRange;

    #[test]
    fn test_record_rounds_total() {
        let ranges = WatchedRanges::from_ranges([
            WatchedRange::new(0.0, 10.4).unwrap(),
            WatchedRange::new(20.0, 30.3).unwrap(),
        ]);
        let record = ProgressRecord::new(UserId::new(), SessionId::new(), ranges, 100.0);
        assert_eq!(record.total_watched_seconds, 21);
    }

    #[test]
    fn test_percentage_ignores_stored_total() {
        let ranges = WatchedRanges::from_ranges([WatchedRange::new(0.0, 30.0).unwrap()]);
        let mut record = ProgressRecord::new(UserId::new(), SessionId::new(), ranges, 100.0);
        record.total_watched_seconds = 100;
        assert_eq!(record.watched_percentage(100.0), 30);
    }

    #[test]
    fn test_record_json_shape() {
        let ranges = WatchedRanges::from_ranges([WatchedRange::new(0.0, 30.0).unwrap()]);
        let record = ProgressRecord::new(UserId::new(), SessionId::new(), ranges, 60.0);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["watched_ranges"][0]["start"], 0.0);
        assert_eq!(value["watched_ranges"][0]["end"], 30.0);
        assert_eq!(value["total_watched_seconds"], 30);
    }
}
