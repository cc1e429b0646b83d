//! User-facing notifications (toasts) emitted by stores after mutations.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

use crate::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub summary: String,
    pub detail: String,
}

impl Notification {
    pub fn success(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

/// Writes notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            NotificationLevel::Success | NotificationLevel::Info => {
                log::info!("{}: {}", n.summary, n.detail)
            }
            NotificationLevel::Warn => log::warn!("{}: {}", n.summary, n.detail),
            NotificationLevel::Error => log::error!("{}: {}", n.summary, n.detail),
        }
    }
}

/// Keeps every notification in memory, for tests and headless front ends.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn levels(&self) -> Vec<NotificationLevel> {
        self.sent().into_iter().map(|n| n.level).collect()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}
