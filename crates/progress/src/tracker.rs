//! Video watch progress tracking.
//!
//! A [`ProgressTracker`] turns a stream of player events into a normalized
//! set of watched ranges. Only time covered by continuous playback counts:
//! seeks move the playhead without recording anything.

use std::sync::Arc;
use lessontrack_core::{
    watched_percentage, ProgressRecord, SessionId, UserId, WatchedRange, WatchedRanges,
};
use lessontrack_storage::ProgressStore;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::notify::{Notice, Notifier};

/// Watch state of one learner on one lesson.
///
/// Only the owning [`ProgressTracker`] mutates it.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Lesson being watched
    pub session_id: SessionId,

    /// Learner watching it
    pub user_id: UserId,

    /// Denominator for the watched percentage, 0 while unknown
    pub video_duration: f64,

    /// Normalized played-through ranges
    pub watched_ranges: WatchedRanges,

    /// Position continuous playback is measured from, `None` when not playing
    pub last_play_start_time: Option<f64>,

    /// Whether the player is currently playing
    pub is_playing: bool,

    /// Sum of range lengths
    pub total_watched_seconds: f64,

    /// Last successful save
    pub last_persisted_at: Option<Instant>,
}

/// Snapshot of a tracker for display and export.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressData {
    /// Lesson
    pub session_id: SessionId,
    /// Learner
    pub user_id: UserId,
    /// Watched ranges
    pub watched_ranges: WatchedRanges,
    /// Current duration
    pub video_duration: f64,
    /// Sum of range lengths
    pub total_watched_seconds: f64,
    /// Clamped, rounded percentage
    pub watched_percentage: u8,
    /// Whether playback is running
    pub is_playing: bool,
}

/// A progress record together with the tracker revision it captures.
#[derive(Debug, Clone)]
pub struct SavePayload {
    /// Revision to pass back to [`ProgressTracker::mark_persisted`]
    pub revision: u64,
    /// Record to write
    pub record: ProgressRecord,
}

/// Per-lesson watch progress tracker.
///
/// Ingestion methods are synchronous and never fail; invalid input from the
/// player integration is ignored. I/O goes through the [`ProgressStore`] and
/// its failures are logged, never propagated.
pub struct ProgressTracker {
    state: ProgressState,
    config: TrackerConfig,
    store: Arc<dyn ProgressStore>,
    notifier: Arc<dyn Notifier>,
    revision: u64,
    persisted_revision: u64,
    implicit_jump_to: Option<f64>,
    destroyed: bool,
    write_guard: Arc<Mutex<()>>,
}

impl ProgressTracker {
    /// Create a tracker with an initial duration estimate (0 = unknown).
    pub fn new(
        session_id: SessionId,
        user_id: UserId,
        estimated_duration_seconds: f64,
        store: Arc<dyn ProgressStore>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        let video_duration = if estimated_duration_seconds.is_finite() && estimated_duration_seconds > 0.0 {
            estimated_duration_seconds
        } else {
            0.0
        };

        Self {
            state: ProgressState {
                session_id,
                user_id,
                video_duration,
                watched_ranges: WatchedRanges::new(),
                last_play_start_time: None,
                is_playing: false,
                total_watched_seconds: 0.0,
                last_persisted_at: None,
            },
            config: config.validate(),
            store,
            notifier,
            revision: 0,
            persisted_revision: 0,
            implicit_jump_to: None,
            destroyed: false,
            write_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Load previously persisted progress.
    ///
    /// A failed or empty load leaves the tracker empty; playback is never
    /// blocked on it. Must be awaited before player events are ingested.
    pub async fn initialize(&mut self) {
        let (user, session) = (self.state.user_id, self.state.session_id);
        match self.store.load_progress(user, session).await {
            Ok(Some(record)) => {
                for range in record.watched_ranges.iter() {
                    self.state.watched_ranges.insert(*range);
                }
                self.state.total_watched_seconds = self.state.watched_ranges.total_seconds();
                if self.state.video_duration <= 0.0 && record.video_duration.is_finite() && record.video_duration > 0.0 {
                    self.state.video_duration = record.video_duration;
                }
                info!(
                    "Resumed progress for {}/{}: {:.0}s watched in {} ranges",
                    user,
                    session,
                    self.state.total_watched_seconds,
                    self.state.watched_ranges.len()
                );
            }
            Ok(None) => {
                debug!("No saved progress for {}/{}", user, session);
            }
            Err(e) => {
                warn!("Failed to load progress for {}/{}, starting fresh: {}", user, session, e);
            }
        }
    }

    // === Event ingestion ===

    /// Playback started at `current_time`.
    pub fn on_play(&mut self, current_time: f64) {
        if self.destroyed || !is_position(current_time) {
            return;
        }
        self.state.last_play_start_time = Some(current_time);
        self.state.is_playing = true;
    }

    /// Periodic position report while playing.
    ///
    /// Folds `[last_play_start_time, current_time]` into the watched ranges
    /// and moves the anchor forward.
    pub fn on_time_update(&mut self, current_time: f64) {
        if self.destroyed || !self.state.is_playing || !is_position(current_time) {
            return;
        }
        self.advance_to(current_time);
    }

    /// Playback paused at `current_time`.
    pub fn on_pause(&mut self, current_time: f64) {
        if self.destroyed {
            return;
        }
        if self.state.is_playing && is_position(current_time) {
            self.advance_to(current_time);
        }
        self.state.is_playing = false;
        self.state.last_play_start_time = None;
    }

    /// The learner moved the playhead from `previous_time` to `new_time`.
    ///
    /// The skipped span is never recorded. Jumps beyond the configured
    /// threshold raise a skipping notice.
    pub fn on_seeked(&mut self, previous_time: f64, new_time: f64) {
        if self.destroyed || !is_position(previous_time) || !is_position(new_time) {
            return;
        }

        if self.state.is_playing {
            self.state.last_play_start_time = Some(new_time);
        }

        // Already flagged when the position report arrived before the seek event
        if self.implicit_jump_to.take() == Some(new_time) {
            return;
        }
        self.flag_jump(previous_time, new_time);
    }

    /// The player reported the real duration.
    ///
    /// Only the percentage denominator changes; recorded ranges are kept.
    pub fn update_video_duration(&mut self, actual_seconds: f64) {
        if self.destroyed || !actual_seconds.is_finite() || actual_seconds <= 0.0 {
            return;
        }
        if actual_seconds != self.state.video_duration {
            debug!(
                "Duration of {} corrected {:.1}s -> {:.1}s",
                self.state.session_id, self.state.video_duration, actual_seconds
            );
            self.state.video_duration = actual_seconds;
        }
    }

    fn advance_to(&mut self, current_time: f64) {
        let Some(anchor) = self.state.last_play_start_time else {
            self.state.last_play_start_time = Some(current_time);
            return;
        };

        let delta = current_time - anchor;
        if delta.abs() > self.config.max_timeupdate_gap_seconds {
            debug!("Position jumped {:.1}s -> {:.1}s without a seek event", anchor, current_time);
            self.flag_jump(anchor, current_time);
            self.implicit_jump_to = Some(current_time);
        } else if delta > 0.0 {
            self.record(anchor, current_time);
        }
        self.state.last_play_start_time = Some(current_time);
    }

    fn record(&mut self, start: f64, end: f64) {
        let Some(mut range) = WatchedRange::new(start, end) else {
            return;
        };
        if self.state.video_duration > 0.0 {
            match range.clamped(self.state.video_duration) {
                Some(clamped) => range = clamped,
                None => return,
            }
        }
        if self.state.watched_ranges.insert(range) {
            self.state.total_watched_seconds = self.state.watched_ranges.total_seconds();
            self.implicit_jump_to = None;
            self.revision += 1;
        }
    }

    fn flag_jump(&self, from: f64, to: f64) {
        let jump = to - from;
        if jump.abs() > self.config.large_jump_threshold_seconds {
            info!(
                "Skipping detected on {}: {:.1}s -> {:.1}s ({:+.1}s)",
                self.state.session_id, from, to, jump
            );
            self.notifier.notify(Notice::SkippingDetected { from, to, jump });
        }
    }

    // === Derived queries ===

    /// Watched percentage, clamped to 100 and 0 while the duration is unknown.
    pub fn watched_percentage(&self) -> u8 {
        watched_percentage(self.state.total_watched_seconds, self.state.video_duration)
    }

    /// Total watched seconds.
    pub fn total_watched_time(&self) -> f64 {
        self.state.total_watched_seconds
    }

    /// Current duration denominator.
    pub fn video_duration(&self) -> f64 {
        self.state.video_duration
    }

    /// Whether playback is running.
    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Read-only view of the state.
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Active configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Store this tracker persists to.
    pub fn store(&self) -> Arc<dyn ProgressStore> {
        self.store.clone()
    }

    /// Notification channel this tracker reports to.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    /// Snapshot for display.
    pub fn progress_data(&self) -> ProgressData {
        ProgressData {
            session_id: self.state.session_id,
            user_id: self.state.user_id,
            watched_ranges: self.state.watched_ranges.clone(),
            video_duration: self.state.video_duration,
            total_watched_seconds: self.state.total_watched_seconds,
            watched_percentage: self.watched_percentage(),
            is_playing: self.state.is_playing,
        }
    }

    /// Persistence payload for the current state.
    pub fn progress_record(&self) -> ProgressRecord {
        ProgressRecord::new(
            self.state.user_id,
            self.state.session_id,
            self.state.watched_ranges.clone(),
            self.state.video_duration,
        )
    }

    // === Persistence ===

    /// Payload plus the revision it reflects, for writes done outside the tracker.
    pub fn save_payload(&self) -> SavePayload {
        SavePayload {
            revision: self.revision,
            record: self.progress_record(),
        }
    }

    /// Lock serializing every store write of this tracker.
    ///
    /// Writers outside the tracker must hold it from before taking their
    /// [`save_payload`](Self::save_payload) until the write returns, so a
    /// slower, older write can never land after a newer one.
    pub fn write_guard(&self) -> Arc<Mutex<()>> {
        self.write_guard.clone()
    }

    /// Record that a payload of `revision` was written at `at`.
    pub fn mark_persisted(&mut self, revision: u64, at: Instant) {
        self.persisted_revision = self.persisted_revision.max(revision);
        self.state.last_persisted_at = Some(at);
    }

    /// Whether ranges changed since the last successful save.
    pub fn has_unsaved_changes(&self) -> bool {
        self.revision > self.persisted_revision
    }

    /// Whether a periodic save should run at `now`.
    pub fn save_due(&self, now: Instant) -> bool {
        if self.destroyed || !self.has_unsaved_changes() {
            return false;
        }
        match self.state.last_persisted_at {
            Some(at) => now.saturating_duration_since(at) >= self.config.save_interval(),
            None => true,
        }
    }

    /// Write the current snapshot. Failures are logged and reported as `false`.
    pub async fn save_progress(&mut self) -> bool {
        let guard = self.write_guard.clone();
        let _writing = guard.lock().await;
        let payload = self.save_payload();
        match self.store.save_progress(&payload.record).await {
            Ok(()) => {
                self.mark_persisted(payload.revision, Instant::now());
                debug!(
                    "Saved progress for {}/{} ({}%)",
                    self.state.user_id,
                    self.state.session_id,
                    self.watched_percentage()
                );
                true
            }
            Err(e) => {
                warn!(
                    "Failed to save progress for {}/{}: {}",
                    self.state.user_id, self.state.session_id, e
                );
                false
            }
        }
    }

    /// Periodic save, throttled to the configured interval.
    pub async fn save_if_due(&mut self) -> bool {
        if !self.save_due(Instant::now()) {
            return false;
        }
        self.save_progress().await
    }

    /// Final best-effort save, then stop accepting events. Safe to call twice.
    pub async fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.save_progress().await;
        self.state.is_playing = false;
        self.state.last_play_start_time = None;
        self.destroyed = true;
        debug!("Tracker for {}/{} destroyed", self.state.user_id, self.state.session_id);
    }
}

fn is_position(t: f64) -> bool {
    t.is_finite() && t >= 0.0
}
