//! Lesson metadata.

use crate::id::SessionId;
use serde::{Deserialize, Serialize};

/// A playable unit of course content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    /// Unique identifier
    pub id: SessionId,

    /// Lesson title
    pub title: String,

    /// Authored length in minutes, if known
    #[serde(default)]
    pub duration_minutes: Option<f64>,
}

impl Lesson {
    /// Create a lesson with unknown duration.
    pub fn new(id: SessionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            duration_minutes: None,
        }
    }

    /// Set the authored duration.
    pub fn with_duration_minutes(mut self, minutes: f64) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Duration estimate in seconds used before the player reports the real one.
    ///
    /// 0 means unknown.
    pub fn estimated_duration_seconds(&self) -> f64 {
        match self.duration_minutes {
            Some(m) if m.is_finite() && m > 0.0 => m * 60.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_duration() {
        let lesson = Lesson::new(SessionId::new(), "Intro").with_duration_minutes(2.5);
        assert_eq!(lesson.estimated_duration_seconds(), 150.0);

        let unknown = Lesson::new(SessionId::new(), "Intro");
        assert_eq!(unknown.estimated_duration_seconds(), 0.0);

        let bogus = Lesson::new(SessionId::new(), "Intro").with_duration_minutes(-3.0);
        assert_eq!(bogus.estimated_duration_seconds(), 0.0);
    }
}
