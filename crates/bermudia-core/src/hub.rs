//! Per-user push notifications.
//!
//! Each user has at most one live connection. Registering a new one
//! closes the previous one with a [`CLOSE_SUPERSEDED`] reason. Delivery is
//! best effort: every committed change makes exactly one send attempt, and
//! a send that fails or outlasts the deadline drops the connection.
//!
//! The hub owns only the sending half of each connection. The socket task
//! drains the [`Subscription`] receiver and closes the socket when it sees
//! [`Outgoing::Close`] or when the channel ends.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;

use bermudia_types::{Notification, UserId};

/// Close reason sent to a connection replaced by a newer one.
pub const CLOSE_SUPERSEDED: &str = "superseded";

/// Close reason sent to a connection that could not keep up.
pub const CLOSE_SLOW: &str = "send timeout";

/// Messages queued for one connection.
const CHANNEL_CAPACITY: usize = 32;

/// What the socket task should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Write a notification frame.
    Notify(Notification),
    /// Send a close frame with this reason and stop.
    Close(&'static str),
}

/// Identifies one registration, so a stale socket task cannot unregister
/// its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

/// The receiving side of a registration.
#[derive(Debug)]
pub struct Subscription {
    /// Owner of the connection.
    pub user: UserId,
    /// Registration id, for [`Hub::unregister`].
    pub id: ConnectionId,
    /// Messages to write to the socket, in commit order.
    pub receiver: mpsc::Receiver<Outgoing>,
}

#[derive(Debug)]
struct Connection {
    id: ConnectionId,
    sender: mpsc::Sender<Outgoing>,
}

/// Registry of live connections.
#[derive(Debug)]
pub struct Hub {
    connections: Mutex<BTreeMap<UserId, Connection>>,
    next_id: AtomicU64,
    send_timeout: Duration,
}

impl Hub {
    /// Create an empty hub with the given per-send deadline.
    pub const fn new(send_timeout: Duration) -> Self {
        Self {
            connections: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            send_timeout,
        }
    }

    fn connections(&self) -> MutexGuard<'_, BTreeMap<UserId, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection for `user`, closing any previous one.
    pub fn register(&self, user: UserId) -> Subscription {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let previous = self.connections().insert(user, Connection { id, sender });
        if let Some(old) = previous {
            // A full queue means the old socket is stuck; dropping the
            // sender ends its stream either way.
            let _ = old.sender.try_send(Outgoing::Close(CLOSE_SUPERSEDED));
            tracing::info!(user_id = %user, "Notification connection superseded");
        }
        tracing::debug!(user_id = %user, connection = id.0, "Notification connection registered");
        Subscription { user, id, receiver }
    }

    /// Remove `user`'s connection if it is still registration `id`.
    pub fn unregister(&self, user: UserId, id: ConnectionId) {
        let mut connections = self.connections();
        if connections.get(&user).is_some_and(|c| c.id == id) {
            connections.remove(&user);
            tracing::debug!(user_id = %user, connection = id.0, "Notification connection closed");
        }
    }

    /// Whether `user` has a live connection.
    pub fn is_connected(&self, user: UserId) -> bool {
        self.connections().contains_key(&user)
    }

    /// Number of live connections.
    pub fn connected(&self) -> usize {
        self.connections().len()
    }

    /// Send one notification to `user`. Returns whether it was queued.
    pub async fn send(&self, user: UserId, notification: Notification) -> bool {
        let target = self
            .connections()
            .get(&user)
            .map(|c| (c.id, c.sender.clone()));
        let Some((id, sender)) = target else {
            return false;
        };

        match tokio::time::timeout(self.send_timeout, sender.send(Outgoing::Notify(notification)))
            .await
        {
            Ok(Ok(())) => true,
            Ok(Err(_closed)) => {
                self.unregister(user, id);
                false
            }
            Err(_elapsed) => {
                tracing::warn!(user_id = %user, "Notification send timed out; dropping connection");
                let _ = sender.try_send(Outgoing::Close(CLOSE_SLOW));
                self.unregister(user, id);
                false
            }
        }
    }

    /// Send `notification` to every connected user. Returns how many
    /// deliveries were queued.
    pub async fn broadcast(&self, notification: &Notification) -> usize {
        let users: Vec<UserId> = self.connections().keys().copied().collect();
        let sends = users
            .into_iter()
            .map(|user| self.send(user, notification.clone()));
        let delivered = futures::future::join_all(sends)
            .await
            .into_iter()
            .filter(|queued| *queued)
            .count();
        tracing::info!(delivered, "Broadcast sent");
        delivered
    }
}
