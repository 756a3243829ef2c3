// Current subject of a dashboard session
use std::sync::Arc;
use tokio::sync::watch;

/// Who the dashboard belongs to. The channel client reads it once per
/// connection attempt, so a change takes effect on the next reconnect.
#[derive(Clone, Debug)]
pub struct Identity {
    subject: Arc<watch::Sender<Option<String>>>,
}

impl Identity {
    pub fn new(subject: Option<String>) -> Self {
        let (subject, _) = watch::channel(subject.filter(|s| !s.is_empty()));
        Self {
            subject: Arc::new(subject),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn current(&self) -> Option<String> {
        self.subject.borrow().clone()
    }

    /// Changes are announced to subscribers only when the subject differs.
    pub fn set(&self, subject: Option<String>) {
        let subject = subject.filter(|s| !s.is_empty());
        self.subject.send_if_modified(|current| {
            if *current == subject {
                return false;
            }
            *current = subject;
            true
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.subject.subscribe()
    }
}
