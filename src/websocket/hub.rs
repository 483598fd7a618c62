//! WebSocket Connection Hub
//!
//! Owns the set of live connections and fans payloads out to all of them.
//!
//! Every operation is a command on one bounded FIFO queue drained by a single
//! actor task, so register, unregister and broadcast are linearized. A
//! broadcast reaches exactly the members present when the actor dequeues it.
//!
//! Each write is bounded by `write_timeout`. A write that fails or times out
//! closes that connection and removes it; delivery to the others continues.
//! Broadcasts never wait for queue space: when the queue is full the new
//! payload is dropped and counted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use uuid::Uuid;

use super::connection::Connection;

/// Unique identifier for a registered connection
pub type ConnectionId = String;

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the command queue
    pub queue_capacity: usize,
    /// Upper bound on a single outbound write
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            write_timeout: Duration::from_secs(2),
        }
    }
}

enum HubCommand {
    Register {
        connection: Arc<dyn Connection>,
        reply: oneshot::Sender<ConnectionId>,
    },
    Unregister {
        id: ConnectionId,
        reply: oneshot::Sender<()>,
    },
    Broadcast {
        payload: Arc<str>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the hub actor. Cheap to clone; the actor stops once every
/// handle is dropped, closing whatever connections remain.
#[derive(Clone)]
pub struct ConnectionHub {
    commands: mpsc::Sender<HubCommand>,
    dropped: Arc<AtomicU64>,
    members: Arc<AtomicUsize>,
}

impl ConnectionHub {
    /// Create a hub and spawn its actor on the current tokio runtime
    pub fn new(config: HubConfig) -> Self {
        let (commands, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let members = Arc::new(AtomicUsize::new(0));

        let actor = HubActor {
            connections: HashMap::new(),
            write_timeout: config.write_timeout,
            members: Arc::clone(&members),
        };
        tokio::spawn(actor.run(receiver));

        Self {
            commands,
            dropped: Arc::new(AtomicU64::new(0)),
            members,
        }
    }

    /// Add a connection to the membership set
    pub async fn register(&self, connection: Arc<dyn Connection>) -> Result<ConnectionId, HubError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(HubCommand::Register { connection, reply })
            .await
            .map_err(|_| HubError::Closed)?;
        response.await.map_err(|_| HubError::Closed)
    }

    /// Remove and close a connection. Unknown ids are ignored.
    pub async fn unregister(&self, id: &str) {
        let (reply, response) = oneshot::channel();
        let command = HubCommand::Unregister {
            id: id.to_string(),
            reply,
        };
        if self.commands.send(command).await.is_ok() {
            let _ = response.await;
        }
    }

    /// Queue a payload for every current member
    pub fn broadcast(&self, payload: impl Into<Arc<str>>) {
        let command = HubCommand::Broadcast {
            payload: payload.into(),
        };
        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped_total = dropped, "Hub queue full, broadcast dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Hub stopped, broadcast discarded");
            }
        }
    }

    /// Number of members, as seen after every previously queued command
    pub async fn connection_count(&self) -> usize {
        let (reply, response) = oneshot::channel();
        if self.commands.send(HubCommand::Count { reply }).await.is_err() {
            return 0;
        }
        response.await.unwrap_or(0)
    }

    /// Last membership size published by the actor. Never waits on the queue.
    pub fn member_count(&self) -> usize {
        self.members.load(Ordering::Relaxed)
    }

    /// Whether the actor is still accepting commands
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Broadcasts discarded because the queue was full
    pub fn dropped_broadcasts(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

struct HubActor {
    connections: HashMap<ConnectionId, Arc<dyn Connection>>,
    write_timeout: Duration,
    members: Arc<AtomicUsize>,
}

impl HubActor {
    async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                HubCommand::Register { connection, reply } => {
                    let id = Uuid::new_v4().to_string();
                    self.connections.insert(id.clone(), connection);
                    self.publish_members();
                    tracing::info!(
                        connection_id = %id,
                        connections = self.connections.len(),
                        "WebSocket connected"
                    );
                    let _ = reply.send(id);
                }
                HubCommand::Unregister { id, reply } => {
                    if let Some(connection) = self.connections.remove(&id) {
                        self.publish_members();
                        self.close(&id, connection).await;
                        tracing::info!(
                            connection_id = %id,
                            connections = self.connections.len(),
                            "WebSocket disconnected"
                        );
                    }
                    let _ = reply.send(());
                }
                HubCommand::Broadcast { payload } => {
                    self.broadcast(&payload).await;
                }
                HubCommand::Count { reply } => {
                    let _ = reply.send(self.connections.len());
                }
            }
        }

        let remaining = std::mem::take(&mut self.connections);
        self.publish_members();
        for (id, connection) in remaining {
            self.close(&id, connection).await;
        }
        tracing::debug!("Connection hub stopped");
    }

    async fn broadcast(&mut self, payload: &str) {
        let mut failed = Vec::new();

        for (id, connection) in &self.connections {
            match timeout(self.write_timeout, connection.send(payload)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(connection_id = %id, error = %e, "Write failed, dropping connection");
                    failed.push(id.clone());
                }
                Err(_) => {
                    tracing::warn!(
                        connection_id = %id,
                        timeout_ms = self.write_timeout.as_millis() as u64,
                        "Write timed out, dropping connection"
                    );
                    failed.push(id.clone());
                }
            }
        }

        if !failed.is_empty() {
            let removed: Vec<_> = failed
                .into_iter()
                .filter_map(|id| self.connections.remove(&id).map(|c| (id, c)))
                .collect();
            self.publish_members();
            for (id, connection) in removed {
                self.close(&id, connection).await;
            }
        }

        tracing::trace!(
            connections = self.connections.len(),
            bytes = payload.len(),
            "Broadcast delivered"
        );
    }

    fn publish_members(&self) {
        self.members.store(self.connections.len(), Ordering::Relaxed);
    }

    async fn close(&self, id: &str, connection: Arc<dyn Connection>) {
        if timeout(self.write_timeout, connection.close()).await.is_err() {
            tracing::debug!(connection_id = %id, "Close timed out");
        }
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Connection hub is not running")]
    Closed,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::websocket::connection::ConnectionError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    /// Records payloads into a channel; can be told to fail or stall
    pub(crate) struct MockConnection {
        tx: mpsc::UnboundedSender<String>,
        fail: bool,
        stall: bool,
        pub closed: AtomicBool,
    }

    impl MockConnection {
        pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            Self::build(false, false)
        }

        pub(crate) fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            Self::build(true, false)
        }

        pub(crate) fn stalled() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            Self::build(false, true)
        }

        fn build(fail: bool, stall: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let conn = Arc::new(Self {
                tx,
                fail,
                stall,
                closed: AtomicBool::new(false),
            });
            (conn, rx)
        }
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn send(&self, payload: &str) -> Result<(), ConnectionError> {
            if self.fail {
                return Err(ConnectionError::Transport("broken pipe".to_string()));
            }
            if self.stall {
                std::future::pending::<()>().await;
            }
            self.tx
                .send(payload.to_string())
                .map_err(|_| ConnectionError::Closed)
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn test_hub() -> ConnectionHub {
        ConnectionHub::new(HubConfig {
            queue_capacity: 64,
            write_timeout: Duration::from_millis(100),
        })
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.write_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = test_hub();
        let (conn, _rx) = MockConnection::new();

        let id = hub.register(conn.clone()).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
        assert!(conn.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unregister_unknown_is_noop() {
        let hub = test_hub();
        let (conn, _rx) = MockConnection::new();
        hub.register(conn).await.unwrap();

        hub.unregister("no-such-connection").await;
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        let hub = test_hub();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            let (conn, rx) = MockConnection::new();
            hub.register(conn).await.unwrap();
            receivers.push(rx);
        }
        let (bystander, mut bystander_rx) = MockConnection::new();

        hub.broadcast("hello");
        // Count is queued behind the broadcast, so delivery is complete
        assert_eq!(hub.connection_count().await, 5);

        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), "hello");
            assert!(rx.try_recv().is_err());
        }
        assert!(bystander_rx.try_recv().is_err());
        assert!(!bystander.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unregistered_before_broadcast_receives_nothing() {
        let hub = test_hub();
        let (kept, mut kept_rx) = MockConnection::new();
        let (gone, mut gone_rx) = MockConnection::new();

        hub.register(kept).await.unwrap();
        let gone_id = hub.register(gone).await.unwrap();

        hub.unregister(&gone_id).await;
        hub.broadcast("after");
        hub.connection_count().await;

        assert_eq!(kept_rx.try_recv().unwrap(), "after");
        assert!(gone_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_write_removes_member() {
        let hub = test_hub();
        let (good_a, mut rx_a) = MockConnection::new();
        let (bad, _bad_rx) = MockConnection::failing();
        let (good_b, mut rx_b) = MockConnection::new();

        hub.register(good_a).await.unwrap();
        hub.register(bad.clone()).await.unwrap();
        hub.register(good_b).await.unwrap();

        hub.broadcast("first");
        assert_eq!(hub.connection_count().await, 2);
        assert!(bad.closed.load(Ordering::SeqCst));
        assert_eq!(rx_a.try_recv().unwrap(), "first");
        assert_eq!(rx_b.try_recv().unwrap(), "first");

        hub.broadcast("second");
        hub.connection_count().await;
        assert_eq!(rx_a.try_recv().unwrap(), "second");
        assert_eq!(rx_b.try_recv().unwrap(), "second");
    }

    #[tokio::test]
    async fn test_stalled_write_times_out() {
        let hub = test_hub();
        let (slow, _slow_rx) = MockConnection::stalled();
        let (fast, mut fast_rx) = MockConnection::new();

        hub.register(slow.clone()).await.unwrap();
        hub.register(fast).await.unwrap();

        hub.broadcast("tick");
        assert_eq!(hub.connection_count().await, 1);
        assert!(slow.closed.load(Ordering::SeqCst));
        assert_eq!(fast_rx.try_recv().unwrap(), "tick");
    }

    #[tokio::test]
    async fn test_full_queue_drops_broadcast() {
        let hub = ConnectionHub::new(HubConfig {
            queue_capacity: 1,
            write_timeout: Duration::from_secs(5),
        });
        let (slow, _slow_rx) = MockConnection::stalled();
        hub.register(slow).await.unwrap();

        // First broadcast occupies the actor, later ones compete for one slot
        for _ in 0..10 {
            hub.broadcast("flood");
        }

        assert!(hub.dropped_broadcasts() >= 8);
    }

    #[tokio::test]
    async fn test_member_count_tracks_membership() {
        let hub = test_hub();
        assert_eq!(hub.member_count(), 0);

        let (a, _rx_a) = MockConnection::new();
        let (b, _rx_b) = MockConnection::failing();
        let id = hub.register(a).await.unwrap();
        hub.register(b).await.unwrap();
        assert_eq!(hub.member_count(), 2);

        hub.broadcast("x");
        hub.connection_count().await;
        assert_eq!(hub.member_count(), 1);

        hub.unregister(&id).await;
        assert_eq!(hub.member_count(), 0);
    }

    #[tokio::test]
    async fn test_member_count_does_not_wait_behind_stalled_writes() {
        let hub = ConnectionHub::new(HubConfig {
            queue_capacity: 64,
            write_timeout: Duration::from_secs(30),
        });
        let (slow, _slow_rx) = MockConnection::stalled();
        hub.register(slow).await.unwrap();

        for _ in 0..5 {
            hub.broadcast("stuck");
        }

        // The queued count would sit behind a 30s write; the gauge answers now
        let queued = tokio::time::timeout(Duration::from_millis(200), hub.connection_count()).await;
        assert!(queued.is_err());
        assert_eq!(hub.member_count(), 1);
    }

    #[tokio::test]
    async fn test_dropping_hub_closes_connections() {
        let hub = test_hub();
        let (conn, _rx) = MockConnection::new();
        hub.register(conn.clone()).await.unwrap();

        drop(hub);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(conn.closed.load(Ordering::SeqCst));
    }
}
