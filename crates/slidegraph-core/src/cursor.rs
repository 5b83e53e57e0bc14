//! Cursor broadcasting.
//!
//! Local positions go out through a [`CursorThrottle`]: the first position of
//! a burst is sent at once, the last one when the throttle window closes, and
//! everything in between is dropped. Remote positions are collected in
//! [`RemoteCursors`], one entry per user, and expire after a fixed window.
//! [`CursorBroadcaster`] runs both on a tokio task.

use std::collections::HashMap;
use std::time::Duration;

use kurbo::Point;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::EngineConfig;
use crate::elements::UserId;
use crate::sync::{CursorIdentity, CursorMessage, CursorPosition, UserInfo};

/// Leading and trailing edge throttle for local cursor positions.
#[derive(Debug, Clone)]
pub struct CursorThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
    pending: Option<CursorPosition>,
}

impl CursorThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
            pending: None,
        }
    }

    /// Offer a position. Returns it when it may be sent now; otherwise it
    /// replaces the pending trailing position.
    pub fn push(&mut self, position: CursorPosition, now: Instant) -> Option<CursorPosition> {
        match self.last_sent {
            Some(last) if now < last + self.interval => {
                self.pending = Some(position);
                None
            }
            _ => {
                self.last_sent = Some(now);
                self.pending = None;
                Some(position)
            }
        }
    }

    /// When the pending position is due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending?;
        Some(self.last_sent? + self.interval)
    }

    /// Take the pending position once its window has closed.
    pub fn flush(&mut self, now: Instant) -> Option<CursorPosition> {
        if self.deadline().is_some_and(|deadline| now >= deadline) {
            self.last_sent = Some(now);
            return self.pending.take();
        }
        None
    }

    /// Drop the pending position.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// A peer cursor and when it was last heard of.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub session_id: String,
    pub position: CursorPosition,
    pub user: Option<UserInfo>,
    pub received_at: Instant,
}

/// Latest cursor of every peer on one slide.
#[derive(Debug, Clone)]
pub struct RemoteCursors {
    identity: CursorIdentity,
    expiry: Duration,
    cursors: HashMap<UserId, RemoteCursor>,
}

impl RemoteCursors {
    /// `identity` is the local session; its own user is never tracked.
    pub fn new(identity: CursorIdentity, expiry: Duration) -> Self {
        Self {
            identity,
            expiry,
            cursors: HashMap::new(),
        }
    }

    /// Apply a received message. Returns whether the aggregate changed.
    pub fn receive(&mut self, message: CursorMessage, now: Instant) -> bool {
        let sender = message.identity();
        if sender.slide_id != self.identity.slide_id || sender.user_id == self.identity.user_id {
            return false;
        }
        match message {
            CursorMessage::Cursor {
                identity,
                position,
                user,
            } => {
                let cursor = RemoteCursor {
                    session_id: identity.session_id,
                    position,
                    user,
                    received_at: now,
                };
                self.cursors.insert(identity.user_id, cursor);
                true
            }
            CursorMessage::CursorLeft { identity } => {
                // Only the session that owns the entry may clear it
                let owned = self
                    .cursors
                    .get(&identity.user_id)
                    .is_some_and(|cursor| cursor.session_id == identity.session_id);
                if owned {
                    self.cursors.remove(&identity.user_id);
                }
                owned
            }
        }
    }

    /// Drop cursors not updated for the expiry window. Returns whether any
    /// were dropped.
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.cursors.len();
        let expiry = self.expiry;
        self.cursors
            .retain(|_, cursor| now.saturating_duration_since(cursor.received_at) < expiry);
        self.cursors.len() != before
    }

    pub fn get(&self, user_id: &str) -> Option<&RemoteCursor> {
        self.cursors.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Position of every tracked user.
    pub fn positions(&self) -> HashMap<UserId, CursorPosition> {
        self.cursors
            .iter()
            .map(|(user, cursor)| (user.clone(), cursor.position))
            .collect()
    }
}

enum Command {
    Local(Option<CursorPosition>),
    Remote(String),
}

struct Worker {
    identity: CursorIdentity,
    user: Option<UserInfo>,
    throttle: CursorThrottle,
    remote: RemoteCursors,
    positions: watch::Sender<HashMap<UserId, CursorPosition>>,
    outgoing: mpsc::UnboundedSender<String>,
}

impl Worker {
    fn handle(&mut self, command: Command, now: Instant) {
        match command {
            Command::Local(Some(position)) => {
                if let Some(position) = self.throttle.push(position, now) {
                    self.send_position(position);
                }
            }
            Command::Local(None) => {
                self.throttle.cancel();
                self.send(CursorMessage::CursorLeft {
                    identity: self.identity.clone(),
                });
            }
            Command::Remote(json) => match CursorMessage::from_json(&json) {
                Ok(message) => {
                    if self.remote.receive(message, now) {
                        self.publish();
                    }
                }
                Err(e) => log::warn!("Ignoring malformed cursor message: {}", e),
            },
        }
    }

    fn flush(&mut self, now: Instant) {
        if let Some(position) = self.throttle.flush(now) {
            self.send_position(position);
        }
    }

    fn prune(&mut self, now: Instant) {
        if self.remote.prune(now) {
            self.publish();
        }
    }

    fn send_position(&self, position: CursorPosition) {
        self.send(CursorMessage::Cursor {
            identity: self.identity.clone(),
            position,
            user: self.user.clone(),
        });
    }

    fn send(&self, message: CursorMessage) {
        match message.to_json() {
            Ok(json) => {
                if self.outgoing.send(json).is_err() {
                    log::debug!("Cursor outgoing queue closed");
                }
            }
            Err(e) => log::error!("Failed to serialize cursor message: {}", e),
        }
    }

    fn publish(&self) {
        let positions = self.remote.positions();
        self.positions.send_if_modified(|current| {
            if *current == positions {
                return false;
            }
            *current = positions;
            true
        });
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, tick: Duration) {
        let mut ticker = time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let deadline = self.throttle.deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command, Instant::now()),
                    None => break,
                },
                _ = ticker.tick() => self.prune(Instant::now()),
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush(Instant::now());
                }
            }
        }
        log::debug!("Cursor broadcaster for {} stopped", self.identity.slide_id);
    }
}

/// Publishes the local cursor and aggregates peer cursors on a tokio task.
///
/// Outgoing messages are JSON strings handed to the host through the
/// receiver returned by [`CursorBroadcaster::spawn`]. Dropping the
/// broadcaster stops the task and its timers.
pub struct CursorBroadcaster {
    commands: mpsc::UnboundedSender<Command>,
    positions: watch::Receiver<HashMap<UserId, CursorPosition>>,
    task: JoinHandle<()>,
}

impl CursorBroadcaster {
    /// Start the broadcaster on the current tokio runtime.
    pub fn spawn(
        identity: CursorIdentity,
        user: Option<UserInfo>,
        config: &EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (positions_tx, positions) = watch::channel(HashMap::new());
        let worker = Worker {
            remote: RemoteCursors::new(identity.clone(), config.cursor_expiry()),
            throttle: CursorThrottle::new(config.cursor_throttle()),
            identity,
            user,
            positions: positions_tx,
            outgoing,
        };
        let task = tokio::spawn(worker.run(command_rx, config.cursor_tick()));
        (
            Self {
                commands,
                positions,
                task,
            },
            outgoing_rx,
        )
    }

    /// Update the local cursor position.
    pub fn set_cursor(&self, position: Point) {
        self.command(Command::Local(Some(position.into())));
    }

    /// Clear the local cursor (e.g. the pointer left the slide).
    pub fn clear_cursor(&self) {
        self.command(Command::Local(None));
    }

    /// Feed a message received from a peer.
    pub fn receive(&self, json: impl Into<String>) {
        self.command(Command::Remote(json.into()));
    }

    /// Current peer cursors.
    pub fn cursors(&self) -> HashMap<UserId, CursorPosition> {
        self.positions.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HashMap<UserId, CursorPosition>> {
        self.positions.clone()
    }

    /// Stop the task. Same as dropping the broadcaster.
    pub fn shutdown(self) {
        drop(self);
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::debug!("Cursor broadcaster already stopped");
        }
    }
}

impl Drop for CursorBroadcaster {
    fn drop(&mut self) {
        self.task.abort();
    }
}
