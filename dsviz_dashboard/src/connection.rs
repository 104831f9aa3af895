use crate::app_state::{ChannelEvent, UiCommand};
use crate::status::ConnectionState;
use dsviz_protocol::ClientCommand;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
    /// An opening handshake that takes longer than this counts as a lost channel.
    pub connect_timeout: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Linear: attempt `n` waits `n * base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Receives every state transition.
pub trait StatusSink {
    fn status_changed(&mut self, state: ConnectionState);
}

impl StatusSink for mpsc::UnboundedSender<ChannelEvent> {
    fn status_changed(&mut self, state: ConnectionState) {
        let _ = self.send(ChannelEvent::Status(state));
    }
}

impl StatusSink for Vec<ConnectionState> {
    fn status_changed(&mut self, state: ConnectionState) {
        self.push(state);
    }
}

/// A reconnect the actor should perform once `delay` has elapsed, unless the
/// machine has moved on (different epoch) by then.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    pub delay: Duration,
    pub epoch: u64,
}

/// Connection lifecycle without any I/O. The actor feeds it events and acts on
/// the returned transitions; every transition goes through the sink.
pub struct ConnectionMachine<S: StatusSink> {
    state: ConnectionState,
    attempt: u32,
    epoch: u64,
    policy: BackoffPolicy,
    sink: S,
}

impl<S: StatusSink> ConnectionMachine<S> {
    pub fn new(policy: BackoffPolicy, sink: S) -> Self {
        Self {
            state: ConnectionState::Idle,
            attempt: 0,
            epoch: 0,
            policy,
            sink,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// No-op while a channel is open or being opened.
    pub fn request_connect(&mut self) -> bool {
        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            return false;
        }
        self.epoch += 1;
        self.transition(ConnectionState::Connecting);
        true
    }

    pub fn on_open(&mut self) {
        self.attempt = 0;
        self.transition(ConnectionState::Connected);
    }

    /// Unexpected close, channel error or failed connect attempt.
    pub fn on_lost(&mut self) -> Option<Retry> {
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Failed | ConnectionState::Idle
        ) {
            return None;
        }
        self.epoch += 1;
        if self.attempt >= self.policy.max_attempts {
            self.transition(ConnectionState::Failed);
            return None;
        }
        self.attempt += 1;
        self.transition(ConnectionState::Reconnecting {
            attempt: self.attempt,
            max: self.policy.max_attempts,
        });
        Some(Retry {
            delay: self.policy.delay_for(self.attempt),
            epoch: self.epoch,
        })
    }

    /// A scheduled retry fired. Stale retries (superseded by a manual
    /// reconnect or a disconnect) do nothing.
    pub fn retry_due(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || !matches!(self.state, ConnectionState::Reconnecting { .. }) {
            return false;
        }
        self.transition(ConnectionState::Connecting);
        true
    }

    pub fn manual_reconnect(&mut self) {
        self.attempt = 0;
        self.epoch += 1;
        self.transition(ConnectionState::Connecting);
    }

    pub fn disconnect(&mut self) {
        self.epoch += 1;
        self.transition(ConnectionState::Disconnected);
    }

    fn transition(&mut self, next: ConnectionState) {
        self.state = next;
        self.sink.status_changed(next);
    }
}

/// UI-side handle to the connection actor. Every call is fire-and-forget.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<UiCommand>,
}

impl ConnectionHandle {
    pub fn from_sender(tx: mpsc::Sender<UiCommand>) -> Self {
        Self { tx }
    }

    pub fn connect(&self) {
        self.submit(UiCommand::Connect);
    }

    pub fn disconnect(&self) {
        self.submit(UiCommand::Disconnect);
    }

    pub fn reconnect(&self) {
        self.submit(UiCommand::Reconnect);
    }

    /// Dropped, not queued, when the channel is not open.
    pub fn send(&self, cmd: ClientCommand) {
        self.submit(UiCommand::Send(cmd));
    }

    /// The reply arrives later as an ordinary `snapshot` frame.
    pub fn request_snapshot(&self, id: &str) {
        self.send(ClientCommand::GetSnapshot { id: id.to_string() });
    }

    fn submit(&self, cmd: UiCommand) {
        if let Err(e) = self.tx.try_send(cmd) {
            tracing::warn!(error = %e, "connection actor unavailable, command dropped");
        }
    }
}
