// Notification feed - newest-first log of push events
use crate::domain::notification::Notification;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared handle to one session's notifications. Clones see the same feed.
#[derive(Clone)]
pub struct NotificationFeed {
    entries: Arc<watch::Sender<VecDeque<Notification>>>,
    max_len: Option<usize>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::with_max_len(None)
    }

    /// `Some(n)` keeps only the `n` newest entries. `Some(0)` is unbounded.
    pub fn with_max_len(max_len: Option<usize>) -> Self {
        let (entries, _) = watch::channel(VecDeque::new());
        Self {
            entries: Arc::new(entries),
            max_len: max_len.filter(|n| *n > 0),
        }
    }

    pub fn push(&self, notification: Notification) {
        let max_len = self.max_len;
        self.entries.send_modify(|entries| {
            entries.push_front(notification);
            if let Some(max_len) = max_len {
                entries.truncate(max_len);
            }
        });
    }

    pub fn clear(&self) {
        self.entries.send_if_modified(|entries| {
            let had_entries = !entries.is_empty();
            entries.clear();
            had_entries
        });
    }

    /// Newest first
    pub fn list(&self) -> Vec<Notification> {
        self.entries.borrow().iter().cloned().collect()
    }

    /// Badge count. There is no read tracking; clearing is the only reset.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> watch::Receiver<VecDeque<Notification>> {
        self.entries.subscribe()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}
