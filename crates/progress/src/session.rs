//! Lesson viewing sessions.
//!
//! A [`LessonSession`] owns everything scoped to one lesson being watched:
//! the tracker, the player adapter and the autosave task. Closing it stops
//! the autosave task before the final save, so no stale periodic write can
//! land after it. [`LessonSwitcher`] keeps at most one session alive.

use std::sync::Arc;
use std::time::Duration;
use lessontrack_core::{Lesson, PlayerEvent, UserId};
use lessontrack_storage::ProgressStore;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::adapter::{dispatch, VideoPlayer};
use crate::completion::{request_completion, CompletionOutcome, CompletionState};
use crate::config::TrackerConfig;
use crate::notify::Notifier;
use crate::tracker::{ProgressData, ProgressTracker};
use crate::validator::CompletionValidator;

struct Autosave {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

/// One lesson being watched by one learner.
pub struct LessonSession {
    lesson: Lesson,
    tracker: Arc<Mutex<ProgressTracker>>,
    player: Arc<dyn VideoPlayer>,
    completion: CompletionState,
    autosave: Option<Autosave>,
}

impl LessonSession {
    /// Create the tracker, load saved progress and start autosaving.
    pub async fn open(
        lesson: Lesson,
        user: UserId,
        store: Arc<dyn ProgressStore>,
        notifier: Arc<dyn Notifier>,
        player: Arc<dyn VideoPlayer>,
        config: TrackerConfig,
    ) -> Self {
        let mut tracker = ProgressTracker::new(
            lesson.id,
            user,
            lesson.estimated_duration_seconds(),
            store,
            notifier,
            config,
        );
        tracker.initialize().await;
        let interval = tracker.config().save_interval();

        let tracker = Arc::new(Mutex::new(tracker));
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(autosave_loop(tracker.clone(), interval, rx));

        info!("Opened lesson {} ({}) for {}", lesson.id, lesson.title, user);

        Self {
            lesson,
            tracker,
            player,
            completion: CompletionState::default(),
            autosave: Some(Autosave {
                shutdown: Some(tx),
                handle,
            }),
        }
    }

    /// Lesson being watched.
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    /// Shared handle to the tracker.
    pub fn tracker(&self) -> Arc<Mutex<ProgressTracker>> {
        self.tracker.clone()
    }

    /// Feed one player event into the tracker.
    pub async fn handle_event(&self, event: PlayerEvent) {
        let mut tracker = self.tracker.lock().await;
        dispatch(&mut tracker, self.player.as_ref(), event);
    }

    /// Current progress snapshot.
    pub async fn progress(&self) -> ProgressData {
        self.tracker.lock().await.progress_data()
    }

    /// Run the completion flow and update the local completed flag.
    ///
    /// The tracker stays unlocked during the save and the validation, so
    /// player events keep flowing while the validator answers.
    pub async fn complete(&mut self, validator: &dyn CompletionValidator) -> CompletionOutcome {
        if !persist(&self.tracker, false).await {
            warn!("Pre-validation save failed; validating against previously stored progress");
        }

        let (user, session, duration, notifier) = {
            let t = self.tracker.lock().await;
            (t.state().user_id, t.state().session_id, t.video_duration(), t.notifier())
        };
        let outcome = request_completion(validator, user, session, duration, notifier.as_ref()).await;
        self.completion.apply(outcome);
        outcome
    }

    /// Whether the validator has accepted this lesson.
    pub fn is_completed(&self) -> bool {
        self.completion.is_completed()
    }

    /// Stop autosaving, perform the final save and tear the tracker down.
    pub async fn close(mut self) -> ProgressData {
        if let Some(mut autosave) = self.autosave.take() {
            if let Some(tx) = autosave.shutdown.take() {
                let _ = tx.send(());
            }
            if let Err(e) = (&mut autosave.handle).await {
                warn!("Autosave task for lesson {} ended abnormally: {}", self.lesson.id, e);
            }
        }

        let mut tracker = self.tracker.lock().await;
        tracker.destroy().await;
        debug!("Closed lesson {}", self.lesson.id);
        tracker.progress_data()
    }
}

impl Drop for LessonSession {
    fn drop(&mut self) {
        let Some(autosave) = self.autosave.take() else {
            return;
        };
        autosave.handle.abort();

        // Dropped without close(): best-effort final save, may be lost
        warn!("Lesson {} dropped without close; attempting final save", self.lesson.id);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let tracker = self.tracker.clone();
            runtime.spawn(async move {
                // An aborted autosave may still hold the write guard until it is reaped
                let _ = autosave.handle.await;
                tracker.lock().await.destroy().await;
            });
        }
    }
}

async fn autosave_loop(
    tracker: Arc<Mutex<ProgressTracker>>,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                persist(&tracker, true).await;
            }
        }
    }
}

/// Write the tracker's latest snapshot without holding its lock during I/O.
///
/// Writes are serialized on the tracker's write guard and the snapshot is
/// taken only once the guard is held, so the store always ends up with the
/// newest state. Lock order is guard, then tracker; nothing may wait on the
/// guard while holding the tracker, which is why `close` stops this task
/// before `destroy`.
async fn persist(tracker: &Mutex<ProgressTracker>, only_if_due: bool) -> bool {
    let guard = tracker.lock().await.write_guard();
    let _writing = guard.lock().await;

    let (payload, store) = {
        let t = tracker.lock().await;
        if only_if_due && !t.save_due(Instant::now()) {
            return false;
        }
        (t.save_payload(), t.store())
    };

    let (user, session) = (payload.record.user_id, payload.record.session_id);
    match store.save_progress(&payload.record).await {
        Ok(()) => {
            tracker.lock().await.mark_persisted(payload.revision, Instant::now());
            debug!("Saved progress for {}/{}", user, session);
            true
        }
        Err(e) => {
            warn!("Failed to save progress for {}/{}, retrying later: {}", user, session, e);
            false
        }
    }
}

/// Keeps exactly one lesson session alive for a learner.
pub struct LessonSwitcher {
    user: UserId,
    store: Arc<dyn ProgressStore>,
    notifier: Arc<dyn Notifier>,
    config: TrackerConfig,
    current: Option<LessonSession>,
}

impl LessonSwitcher {
    /// Create a switcher with no active lesson.
    pub fn new(
        user: UserId,
        store: Arc<dyn ProgressStore>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            user,
            store,
            notifier,
            config,
            current: None,
        }
    }

    /// Configuration used for lessons opened from now on.
    pub fn set_config(&mut self, config: TrackerConfig) {
        self.config = config;
    }

    /// Close the current lesson (final save included), then open `lesson`.
    pub async fn switch_to(&mut self, lesson: Lesson, player: Arc<dyn VideoPlayer>) -> &mut LessonSession {
        self.close_current().await;
        let session = LessonSession::open(
            lesson,
            self.user,
            self.store.clone(),
            self.notifier.clone(),
            player,
            self.config.clone(),
        )
        .await;
        self.current.insert(session)
    }

    /// Active lesson, if any.
    pub fn current(&self) -> Option<&LessonSession> {
        self.current.as_ref()
    }

    /// Active lesson, mutably.
    pub fn current_mut(&mut self) -> Option<&mut LessonSession> {
        self.current.as_mut()
    }

    /// Close the active lesson, returning its final progress.
    pub async fn close_current(&mut self) -> Option<ProgressData> {
        match self.current.take() {
            Some(session) => Some(session.close().await),
            None => None,
        }
    }
}
