//! Transient user notifications
//!
//! Every mutation reports its outcome once. The dashboard context holds a
//! [`Notifier`]; the CLI uses [`TracingNotifier`], tests use
//! [`RecordingNotifier`] to assert on the exact texts.

use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    fn success(&self, text: &str) {
        self.notify(Notice {
            kind: NoticeKind::Success,
            text: text.to_string(),
        });
    }

    fn error(&self, text: &str) {
        self.notify(Notice {
            kind: NoticeKind::Error,
            text: text.to_string(),
        });
    }
}

/// Emits notices as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => info!(target: "attendx::notice", "{}", notice.text),
            NoticeKind::Error => warn!(target: "attendx::notice", "{}", notice.text),
        }
    }
}

/// Keeps every notice in order
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent notice
    pub fn last(&self) -> Option<Notice> {
        self.notices().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.success("Message sent successfully");
        notifier.error("Failed to delete message");

        let notices = notifier.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].kind, NoticeKind::Success);
        assert_eq!(
            notifier.last(),
            Some(Notice {
                kind: NoticeKind::Error,
                text: "Failed to delete message".to_string()
            })
        );
    }
}
