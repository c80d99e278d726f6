//! Video player adapter.
//!
//! The embedded player is wrapped behind [`VideoPlayer`]; [`dispatch`] is the
//! only place that translates its events into tracker calls. The tracker
//! itself never sees the player.

use std::sync::Mutex;
use lessontrack_core::PlayerEvent;
use tracing::trace;

use crate::tracker::ProgressTracker;

/// Queries the tracker's owner may make against the embedded player.
pub trait VideoPlayer: Send + Sync {
    /// Real duration in seconds, 0 or less while unknown.
    fn duration(&self) -> f64;

    /// Current playhead position in seconds.
    fn current_time(&self) -> f64;
}

/// Route one player event into the tracker.
pub fn dispatch(tracker: &mut ProgressTracker, player: &dyn VideoPlayer, event: PlayerEvent) {
    trace!("player event {:?}", event);
    match event {
        PlayerEvent::Ready => tracker.update_video_duration(player.duration()),
        PlayerEvent::Play { time } => tracker.on_play(time),
        PlayerEvent::Pause { time } => tracker.on_pause(time),
        PlayerEvent::TimeUpdate { time } => tracker.on_time_update(time),
        PlayerEvent::Seeked { from, to } => tracker.on_seeked(from, to),
        PlayerEvent::Ended => {
            let duration = player.duration();
            if duration > 0.0 {
                tracker.update_video_duration(duration);
            }
            tracker.on_pause(player.current_time());
        }
    }
}

/// Player stand-in that follows the events it is fed.
///
/// Used when replaying a recorded event log, where no real player exists.
#[derive(Debug, Default)]
pub struct ReplayPlayer {
    duration: f64,
    position: Mutex<f64>,
}

impl ReplayPlayer {
    /// Create a replay player for a video of `duration` seconds.
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            position: Mutex::new(0.0),
        }
    }

    /// Move the playhead according to `event`.
    pub fn observe(&self, event: &PlayerEvent) {
        let mut position = self.position.lock().unwrap_or_else(|e| e.into_inner());
        match *event {
            PlayerEvent::Play { time } | PlayerEvent::Pause { time } | PlayerEvent::TimeUpdate { time } => {
                *position = time;
            }
            PlayerEvent::Seeked { to, .. } => *position = to,
            PlayerEvent::Ended => {
                if self.duration > 0.0 {
                    *position = self.duration;
                }
            }
            PlayerEvent::Ready => {}
        }
    }
}

impl VideoPlayer for ReplayPlayer {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        *self.position.lock().unwrap_or_else(|e| e.into_inner())
    }
}
