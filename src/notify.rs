use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::FinderError;
use crate::models::ErrorKind;

const CHANNEL_CAPACITY: usize = 16;

/// A transient, user-facing message (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&FinderError> for Notice {
    fn from(err: &FinderError) -> Self {
        Notice {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

/// Holds at most one visible notice and fans raised notices out to subscribers.
pub struct Notifier {
    visible: Mutex<Option<Notice>>,
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            visible: Mutex::new(None),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Shows `notice` unless another one is still visible.
    pub fn raise(&self, notice: Notice) -> bool {
        let mut visible = match self.visible.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(current) = visible.as_ref() {
            debug!(current = %current.message, dropped = %notice.message, "notice suppressed");
            return false;
        }
        *visible = Some(notice.clone());
        // No receivers is fine; the host may poll `visible()` instead.
        let _ = self.tx.send(notice);
        true
    }

    pub fn dismiss(&self) {
        let mut visible = match self.visible.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *visible = None;
    }

    pub fn visible(&self) -> Option<Notice> {
        match self.visible.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
