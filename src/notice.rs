//! User-facing error notices
//!
//! A failed call raises one notice at a time. Non-retryable failures stay
//! up until dismissed. Retryable ones offer a retry and go away on their
//! own after a while, unless the user expanded the details or interacted.

use crate::transport::{ErrorKind, TypedError};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeAction {
    Retry,
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: ErrorKind,
    /// Primary text, fixed per kind
    pub message: &'static str,
    /// Technical detail, shown only when expanded
    pub detail: String,
    pub persistent: bool,
    pub actions: Vec<NoticeAction>,
    pub remediation: Option<&'static str>,
    pub expanded: bool,
}

impl Notice {
    fn from_error(id: u64, error: &TypedError) -> Self {
        let persistent = !error.is_retryable();
        let actions = if persistent {
            vec![NoticeAction::Dismiss]
        } else {
            vec![NoticeAction::Retry, NoticeAction::Dismiss]
        };
        Self {
            id,
            kind: error.kind,
            message: error.user_message(),
            detail: error.technical_message.clone(),
            persistent,
            actions,
            remediation: remediation(error.kind),
            expanded: false,
        }
    }
}

fn remediation(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::BackendUnreachable => Some(
            "Start the assessment service, confirm SYMPTOM_API_URL matches its address, \
             then try again.",
        ),
        _ => None,
    }
}

type Slot = Arc<Mutex<Option<Notice>>>;

fn lock(slot: &Slot) -> std::sync::MutexGuard<'_, Option<Notice>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the current notice and its auto-dismiss timer
pub struct NoticeBoard {
    current: Slot,
    dismiss_after: Duration,
    timer: Option<CancellationToken>,
    next_id: u64,
}

impl NoticeBoard {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            dismiss_after,
            timer: None,
            next_id: 0,
        }
    }

    /// Replace any current notice with one for `error`
    pub fn show(&mut self, error: &TypedError) -> Notice {
        self.cancel_timer();
        self.next_id += 1;
        let notice = Notice::from_error(self.next_id, error);
        *lock(&self.current) = Some(notice.clone());

        if !notice.persistent {
            self.schedule_dismiss(notice.id);
        }
        notice
    }

    pub fn current(&self) -> Option<Notice> {
        lock(&self.current).clone()
    }

    /// Reveal the technical detail; the notice then stays up
    pub fn expand(&mut self) {
        self.cancel_timer();
        if let Some(notice) = lock(&self.current).as_mut() {
            notice.expanded = true;
        }
    }

    /// Any user interaction with the notice stops the auto-dismiss
    pub fn interact(&mut self) {
        self.cancel_timer();
    }

    pub fn dismiss(&mut self) {
        self.cancel_timer();
        *lock(&self.current) = None;
    }

    fn schedule_dismiss(&mut self, id: u64) {
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!(id, "No runtime, notice will not auto-dismiss");
            return;
        };

        let token = CancellationToken::new();
        self.timer = Some(token.clone());
        let slot = self.current.clone();
        let delay = self.dismiss_after;

        handle.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let mut current = lock(&slot);
                    if current.as_ref().is_some_and(|n| n.id == id) {
                        *current = None;
                        tracing::debug!(id, "Notice auto-dismissed");
                    }
                }
            }
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }
}

impl Drop for NoticeBoard {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
