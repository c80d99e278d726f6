//! Video player events.

use serde::{Deserialize, Serialize};

/// An event emitted by an embedded video player.
///
/// Times are playhead positions in seconds. The serialized form is one JSON
/// object per event, e.g. `{"event":"time_update","time":12.5}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Player loaded; duration is now available
    Ready,
    /// Playback started
    Play {
        /// Playhead position
        time: f64,
    },
    /// Playback paused
    Pause {
        /// Playhead position
        time: f64,
    },
    /// Periodic position report while playing
    TimeUpdate {
        /// Playhead position
        time: f64,
    },
    /// Learner moved the playhead
    Seeked {
        /// Position before the seek
        from: f64,
        /// Position after the seek
        to: f64,
    },
    /// Playback reached the end
    Ended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event: PlayerEvent = serde_json::from_str(r#"{"event":"time_update","time":12.5}"#).unwrap();
        assert_eq!(event, PlayerEvent::TimeUpdate { time: 12.5 });

        let event: PlayerEvent = serde_json::from_str(r#"{"event":"seeked","from":10,"to":90}"#).unwrap();
        assert_eq!(event, PlayerEvent::Seeked { from: 10.0, to: 90.0 });

        let json = serde_json::to_string(&PlayerEvent::Ended).unwrap();
        assert_eq!(json, r#"{"event":"ended"}"#);
    }
}
