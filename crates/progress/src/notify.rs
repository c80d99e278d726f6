//! User-facing notices (toasts).

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Feedback the tracker and completion flow surface to the learner.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A seek jumped further than the configured threshold
    SkippingDetected {
        /// Position before the seek
        from: f64,
        /// Position after the seek
        to: f64,
        /// `to - from`
        jump: f64,
    },
    /// The validator did not accept the lesson as complete
    CompletionRejected {
        /// Percentage the validator measured
        watched_percentage: u8,
        /// Percentage it requires
        required_percentage: u8,
    },
    /// The validator accepted the lesson as complete
    CompletionConfirmed {
        /// Percentage the validator measured
        watched_percentage: u8,
    },
    /// Completion could not be checked right now
    CompletionUnavailable,
}

impl Notice {
    /// Text shown to the learner.
    pub fn message(&self) -> String {
        match self {
            Notice::SkippingDetected { jump, .. } => format!(
                "Skipping detected ({:.0}s). Only the parts you actually watch count toward completion.",
                jump.abs()
            ),
            Notice::CompletionRejected { watched_percentage, required_percentage } => format!(
                "You have watched {}% of this lesson. Watch at least {}% to mark it complete.",
                watched_percentage, required_percentage
            ),
            Notice::CompletionConfirmed { .. } => "Lesson marked as complete.".to_string(),
            Notice::CompletionUnavailable => {
                "Could not verify your progress right now. Please try again.".to_string()
            }
        }
    }
}

/// Channel to the UI's notification surface.
pub trait Notifier: Send + Sync {
    /// Show a notice. Must not block.
    fn notify(&self, notice: Notice);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::SkippingDetected { .. } | Notice::CompletionRejected { .. } | Notice::CompletionUnavailable => {
                warn!("{}", notice.message())
            }
            Notice::CompletionConfirmed { .. } => info!("{}", notice.message()),
        }
    }
}

/// Notifier that forwards notices to a UI task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end for the UI.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // Receiver gone means the UI was torn down; nothing left to show.
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_mentions_both_percentages() {
        let notice = Notice::CompletionRejected { watched_percentage: 70, required_percentage: 80 };
        let msg = notice.message();
        assert!(msg.contains("70%"));
        assert!(msg.contains("80%"));
    }

    #[test]
    fn test_channel_notifier_delivers() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(Notice::CompletionConfirmed { watched_percentage: 95 });
        assert_eq!(rx.try_recv().unwrap(), Notice::CompletionConfirmed { watched_percentage: 95 });
    }

    #[test]
    fn test_channel_notifier_survives_closed_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(Notice::CompletionUnavailable);
    }
}
