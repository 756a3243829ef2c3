// Push channel state machine
//
// Pure transition logic: the driver feeds it connection events and carries out
// the actions it returns. No I/O and no timers live here.
use crate::application::classifier::classify;
use crate::domain::notification::Notification;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelInput {
    Opened,
    Closed,
    Failed(String),
    Message {
        text: String,
        received_at: DateTime<Utc>,
    },
    ReconnectDue,
    /// The session's subject changed while a connection is open.
    IdentityChanged,
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelAction {
    Send(String),
    Deliver(Notification),
    CloseSocket,
    ScheduleReconnect(Duration),
    Connect,
}

#[derive(Debug)]
pub struct ChannelMachine {
    state: ChannelState,
    identity: Option<String>,
    reconnect_delay: Duration,
    reconnect_scheduled: bool,
    torn_down: bool,
}

impl ChannelMachine {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ChannelState::Connecting,
            identity: None,
            reconnect_delay,
            reconnect_scheduled: false,
            torn_down: false,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Records the identity read for the connection attempt in progress.
    pub fn begin_attempt(&mut self, identity: Option<String>) {
        self.identity = identity.filter(|id| !id.is_empty());
    }

    pub fn handle(&mut self, input: ChannelInput) -> Vec<ChannelAction> {
        if self.torn_down {
            return match input {
                ChannelInput::Opened => vec![ChannelAction::CloseSocket],
                _ => Vec::new(),
            };
        }

        match input {
            ChannelInput::Opened => self.on_opened(),
            ChannelInput::Closed => self.on_closed(false),
            ChannelInput::Failed(reason) => {
                tracing::warn!("push channel error: {}", reason);
                self.on_closed(true)
            }
            ChannelInput::Message { text, received_at } => self.on_message(&text, received_at),
            ChannelInput::ReconnectDue => self.on_reconnect_due(),
            ChannelInput::IdentityChanged => self.on_identity_changed(),
            ChannelInput::Teardown => {
                self.torn_down = true;
                self.state = ChannelState::Closed;
                self.reconnect_scheduled = false;
                vec![ChannelAction::CloseSocket]
            }
        }
    }

    fn on_opened(&mut self) -> Vec<ChannelAction> {
        if self.state != ChannelState::Connecting {
            tracing::debug!("ignoring open event while {:?}", self.state);
            return Vec::new();
        }
        self.state = ChannelState::Open;
        self.identity
            .as_ref()
            .map(|subject| identify_frame(subject))
            .map(ChannelAction::Send)
            .into_iter()
            .collect()
    }

    fn on_closed(&mut self, errored: bool) -> Vec<ChannelAction> {
        if self.state == ChannelState::Closed {
            return Vec::new();
        }
        self.state = ChannelState::Closed;

        let mut actions = Vec::new();
        if errored {
            actions.push(ChannelAction::CloseSocket);
        }
        if !self.reconnect_scheduled {
            self.reconnect_scheduled = true;
            actions.push(ChannelAction::ScheduleReconnect(self.reconnect_delay));
        }
        actions
    }

    fn on_message(&mut self, text: &str, received_at: DateTime<Utc>) -> Vec<ChannelAction> {
        if self.state != ChannelState::Open {
            tracing::debug!("dropping frame received while {:?}", self.state);
            return Vec::new();
        }
        let Some(inbound) = classify(text) else {
            return Vec::new();
        };
        if !inbound.is_for(self.identity()) {
            tracing::trace!("dropping frame addressed to {:?}", inbound.target);
            return Vec::new();
        }
        vec![ChannelAction::Deliver(
            inbound.event.into_notification(received_at),
        )]
    }

    /// The open connection is bound to the old subject. Drop it and
    /// reconnect right away so the new subject identifies itself.
    fn on_identity_changed(&mut self) -> Vec<ChannelAction> {
        if self.state != ChannelState::Open {
            return Vec::new();
        }
        self.state = ChannelState::Closed;
        self.reconnect_scheduled = true;
        vec![
            ChannelAction::CloseSocket,
            ChannelAction::ScheduleReconnect(Duration::ZERO),
        ]
    }

    fn on_reconnect_due(&mut self) -> Vec<ChannelAction> {
        if self.state != ChannelState::Closed || !self.reconnect_scheduled {
            return Vec::new();
        }
        self.reconnect_scheduled = false;
        self.state = ChannelState::Connecting;
        vec![ChannelAction::Connect]
    }
}

/// First frame sent on every opened connection.
pub fn identify_frame(subject: &str) -> String {
    serde_json::json!({ "type": "identify", "subject": subject }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::NotificationKind;

    const DELAY: Duration = Duration::from_secs(3);

    fn message(text: &str) -> ChannelInput {
        ChannelInput::Message {
            text: text.to_string(),
            received_at: Utc::now(),
        }
    }

    fn open_machine(identity: Option<&str>) -> ChannelMachine {
        let mut machine = ChannelMachine::new(DELAY);
        machine.begin_attempt(identity.map(str::to_string));
        machine.handle(ChannelInput::Opened);
        machine
    }

    fn delivered(actions: &[ChannelAction]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, ChannelAction::Deliver(_)))
            .count()
    }

    #[test]
    fn test_starts_connecting() {
        assert_eq!(ChannelMachine::new(DELAY).state(), ChannelState::Connecting);
    }

    #[test]
    fn test_identify_sent_on_open() {
        let mut machine = ChannelMachine::new(DELAY);
        machine.begin_attempt(Some("alice".to_string()));
        let actions = machine.handle(ChannelInput::Opened);

        assert_eq!(machine.state(), ChannelState::Open);
        match actions.as_slice() {
            [ChannelAction::Send(frame)] => {
                let frame: serde_json::Value = serde_json::from_str(frame).unwrap();
                assert_eq!(frame, serde_json::json!({"type": "identify", "subject": "alice"}));
            }
            other => panic!("unexpected actions {:?}", other),
        }
    }

    #[test]
    fn test_no_identify_without_identity() {
        let mut machine = ChannelMachine::new(DELAY);
        machine.begin_attempt(Some(String::new()));
        assert!(machine.handle(ChannelInput::Opened).is_empty());
        assert_eq!(machine.state(), ChannelState::Open);
    }

    #[test]
    fn test_close_schedules_one_reconnect() {
        let mut machine = open_machine(Some("alice"));

        let actions = machine.handle(ChannelInput::Closed);
        assert_eq!(actions, vec![ChannelAction::ScheduleReconnect(DELAY)]);
        assert_eq!(machine.state(), ChannelState::Closed);

        // repeated close events for the same closure schedule nothing
        assert!(machine.handle(ChannelInput::Closed).is_empty());
        assert!(machine.handle(ChannelInput::Failed("late".into())).is_empty());

        assert_eq!(machine.handle(ChannelInput::ReconnectDue), vec![ChannelAction::Connect]);
        assert_eq!(machine.state(), ChannelState::Connecting);
    }

    #[test]
    fn test_error_closes_socket() {
        let mut machine = open_machine(None);
        let actions = machine.handle(ChannelInput::Failed("reset".into()));
        assert_eq!(
            actions,
            vec![
                ChannelAction::CloseSocket,
                ChannelAction::ScheduleReconnect(DELAY)
            ]
        );
    }

    #[test]
    fn test_connect_failure_is_a_closure() {
        let mut machine = ChannelMachine::new(DELAY);
        let actions = machine.handle(ChannelInput::Failed("refused".into()));
        assert!(actions.contains(&ChannelAction::ScheduleReconnect(DELAY)));
        assert_eq!(machine.state(), ChannelState::Closed);
    }

    #[test]
    fn test_reconnect_ignored_unless_closed() {
        let mut machine = ChannelMachine::new(DELAY);
        assert!(machine.handle(ChannelInput::ReconnectDue).is_empty());
        assert_eq!(machine.state(), ChannelState::Connecting);

        machine.handle(ChannelInput::Opened);
        assert!(machine.handle(ChannelInput::ReconnectDue).is_empty());
        assert_eq!(machine.state(), ChannelState::Open);
    }

    #[test]
    fn test_teardown_is_terminal() {
        let mut machine = open_machine(Some("alice"));
        assert_eq!(machine.handle(ChannelInput::Teardown), vec![ChannelAction::CloseSocket]);
        assert!(machine.is_torn_down());
        assert_eq!(machine.state(), ChannelState::Closed);

        assert!(machine.handle(ChannelInput::Closed).is_empty());
        assert!(machine.handle(ChannelInput::ReconnectDue).is_empty());
        assert!(machine
            .handle(message(r#"{"alert":"x","timestamp":"t"}"#))
            .is_empty());
        assert_eq!(machine.handle(ChannelInput::Opened), vec![ChannelAction::CloseSocket]);
    }

    #[test]
    fn test_identity_change_reconnects_immediately() {
        let mut machine = open_machine(Some("alice"));
        assert_eq!(
            machine.handle(ChannelInput::IdentityChanged),
            vec![
                ChannelAction::CloseSocket,
                ChannelAction::ScheduleReconnect(Duration::ZERO)
            ]
        );
        assert_eq!(machine.state(), ChannelState::Closed);

        // already closed: the pending reconnect picks up the new subject
        assert!(machine.handle(ChannelInput::IdentityChanged).is_empty());
        assert_eq!(machine.handle(ChannelInput::ReconnectDue), vec![ChannelAction::Connect]);

        machine.begin_attempt(Some("bob".to_string()));
        machine.handle(ChannelInput::Opened);
        assert_eq!(machine.identity(), Some("bob"));
    }

    #[test]
    fn test_teardown_cancels_pending_reconnect() {
        let mut machine = open_machine(None);
        machine.handle(ChannelInput::Closed);
        machine.handle(ChannelInput::Teardown);
        assert!(machine.handle(ChannelInput::ReconnectDue).is_empty());
    }

    #[test]
    fn test_messages_only_while_open() {
        let mut machine = ChannelMachine::new(DELAY);
        let alert = r#"{"alert":"Low water","timestamp":"2024-05-01T10:00:00Z"}"#;
        assert!(machine.handle(message(alert)).is_empty());

        machine.handle(ChannelInput::Opened);
        let actions = machine.handle(message(alert));
        match actions.as_slice() {
            [ChannelAction::Deliver(notification)] => {
                assert_eq!(notification.kind, NotificationKind::Alert);
                assert_eq!(notification.text, "🔔 Low water (10:00:00)");
            }
            other => panic!("unexpected actions {:?}", other),
        }

        machine.handle(ChannelInput::Closed);
        assert!(machine.handle(message(alert)).is_empty());
    }

    #[test]
    fn test_targeting_filter() {
        let for_alice = r#"{"alert":"x","timestamp":"t","subject":"alice"}"#;
        let broadcast = r#"{"alert":"x","timestamp":"t"}"#;

        let mut bob = open_machine(Some("bob"));
        assert_eq!(delivered(&bob.handle(message(for_alice))), 0);
        assert_eq!(delivered(&bob.handle(message(broadcast))), 1);

        let mut alice = open_machine(Some("alice"));
        assert_eq!(delivered(&alice.handle(message(for_alice))), 1);
    }

    #[test]
    fn test_garbage_does_not_close() {
        let mut machine = open_machine(Some("alice"));
        assert!(machine.handle(message("{not json")).is_empty());
        assert!(machine.handle(message(r#"{"kind":"weather"}"#)).is_empty());
        assert_eq!(machine.state(), ChannelState::Open);
    }
}
