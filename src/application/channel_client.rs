// Channel client - Drives the push channel state machine on a task
use crate::application::channel_machine::{ChannelAction, ChannelInput, ChannelMachine, ChannelState};
use crate::application::identity::Identity;
use crate::application::notification_feed::NotificationFeed;
use crate::application::push_connector::{PushConnection, PushConnector};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owner's handle to one push channel. Dropping it tears the channel down.
pub struct ChannelClient {
    state: watch::Receiver<ChannelState>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ChannelClient {
    pub fn spawn(
        connector: Arc<dyn PushConnector>,
        identity: Identity,
        feed: NotificationFeed,
        reconnect_delay: Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = ChannelDriver {
            connector,
            identity: identity.subscribe(),
            feed,
            machine: ChannelMachine::new(reconnect_delay),
            state: state_tx,
            shutdown: shutdown_rx,
        };

        Self {
            state: state_rx,
            shutdown: shutdown_tx,
            task: Some(tokio::spawn(driver.run())),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Close the socket and stop reconnecting. Waits for the driver to exit.
    pub async fn teardown(mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("push channel driver ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum Step {
    Continue,
    Reconnect(Duration),
    Stop,
}

struct ChannelDriver {
    connector: Arc<dyn PushConnector>,
    identity: watch::Receiver<Option<String>>,
    feed: NotificationFeed,
    machine: ChannelMachine,
    state: watch::Sender<ChannelState>,
    shutdown: watch::Receiver<bool>,
}

impl ChannelDriver {
    async fn run(mut self) {
        loop {
            let subject = self.identity.borrow_and_update().clone();
            self.machine.begin_attempt(subject);
            self.publish();
            tracing::debug!("connecting push channel to {}", self.connector.endpoint());

            let connected = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break,
                Ok(()) = self.identity.changed() => {
                    tracing::debug!("subject changed while connecting, starting over");
                    continue;
                }
                result = self.connector.connect() => result,
            };

            let step = match connected {
                Ok(connection) => self.serve(connection).await,
                Err(e) => {
                    let actions = self.machine.handle(ChannelInput::Failed(e.to_string()));
                    self.execute(actions, &mut None).await
                }
            };
            self.publish();

            let delay = match step {
                Step::Reconnect(delay) => delay,
                Step::Continue | Step::Stop => break,
            };
            tracing::info!("push channel closed, reconnecting in {:?}", delay);

            tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break,
                Ok(()) = self.identity.changed() => {}
                _ = tokio::time::sleep(delay) => {}
            }
            if !self
                .machine
                .handle(ChannelInput::ReconnectDue)
                .contains(&ChannelAction::Connect)
            {
                break;
            }
        }

        self.machine.handle(ChannelInput::Teardown);
        self.publish();
        tracing::debug!("push channel driver stopped");
    }

    /// Runs one open connection until it closes or the owner tears down.
    async fn serve(&mut self, connection: Box<dyn PushConnection>) -> Step {
        let mut connection = Some(connection);

        let actions = self.machine.handle(ChannelInput::Opened);
        self.publish();
        tracing::info!("push channel open on {}", self.connector.endpoint());

        let mut step = self.execute(actions, &mut connection).await;
        while let Step::Continue = step {
            let Some(socket) = connection.as_mut() else {
                break;
            };
            let input = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => ChannelInput::Teardown,
                Ok(()) = self.identity.changed() => ChannelInput::IdentityChanged,
                frame = socket.recv_text() => match frame {
                    Some(Ok(text)) => ChannelInput::Message { text, received_at: Utc::now() },
                    Some(Err(e)) => ChannelInput::Failed(e.to_string()),
                    None => ChannelInput::Closed,
                },
            };
            let actions = self.machine.handle(input);
            step = self.execute(actions, &mut connection).await;
        }
        step
    }

    async fn execute(
        &mut self,
        actions: Vec<ChannelAction>,
        connection: &mut Option<Box<dyn PushConnection>>,
    ) -> Step {
        let mut queue: VecDeque<ChannelAction> = actions.into();
        let mut reconnect = None;

        while let Some(action) = queue.pop_front() {
            match action {
                ChannelAction::Send(text) => {
                    let Some(socket) = connection.as_mut() else {
                        continue;
                    };
                    if let Err(e) = socket.send_text(text).await {
                        queue.extend(self.machine.handle(ChannelInput::Failed(e.to_string())));
                    }
                }
                ChannelAction::Deliver(notification) => {
                    tracing::debug!("notification: {}", notification.text);
                    self.feed.push(notification);
                }
                ChannelAction::CloseSocket => {
                    if let Some(mut socket) = connection.take() {
                        socket.close().await;
                    }
                }
                ChannelAction::ScheduleReconnect(delay) => reconnect = Some(delay),
                ChannelAction::Connect => {}
            }
        }

        match reconnect {
            Some(delay) => Step::Reconnect(delay),
            None if self.machine.is_torn_down() => Step::Stop,
            None if self.machine.state() == ChannelState::Open => Step::Continue,
            None => Step::Stop,
        }
    }

    fn publish(&self) {
        let current = self.machine.state();
        self.state.send_if_modified(|state| {
            let changed = *state != current;
            *state = current;
            changed
        });
    }
}

/// Resolves once the owner asked for teardown or went away.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
