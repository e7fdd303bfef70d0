//! Long-lived connection tracking.
//!
//! WebSocket sessions and SSE subscriptions outlive the request that opened
//! them. Each one holds a [`ConnectionGuard`] so the server can report how
//! many are open and tag log lines with a stable identifier.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global counter for connection IDs. Only uniqueness matters.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Kind of long-lived connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    WebSocket,
    EventStream,
}

impl ConnectionKind {
    fn prefix(self) -> &'static str {
        match self {
            ConnectionKind::WebSocket => "ws",
            ConnectionKind::EventStream => "sse",
        }
    }
}

/// Unique identifier for a connection, rendered as `ws-<n>` or `sse-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    kind: ConnectionKind,
    seq: u64,
}

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new(kind: ConnectionKind) -> Self {
        Self {
            kind,
            seq: CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn as_u64(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.seq)
    }
}

/// Counts open WebSocket sessions and SSE streams.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    websockets: Arc<AtomicU64>,
    event_streams: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new open connection. The returned guard decrements on drop.
    pub fn track(&self, kind: ConnectionKind) -> ConnectionGuard {
        let counter = Arc::clone(self.counter(kind));
        let open = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = ConnectionId::new(kind);
        crate::observability::metrics::set_open_connections(kind, open);
        tracing::debug!(connection_id = %id, open, "Connection opened");
        ConnectionGuard { counter, id }
    }

    /// Number of open connections of `kind`.
    pub fn active(&self, kind: ConnectionKind) -> u64 {
        self.counter(kind).load(Ordering::SeqCst)
    }

    fn counter(&self, kind: ConnectionKind) -> &Arc<AtomicU64> {
        match kind {
            ConnectionKind::WebSocket => &self.websockets,
            ConnectionKind::EventStream => &self.event_streams,
        }
    }
}

/// Guard held for a connection's lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    counter: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let open = self.counter.fetch_sub(1, Ordering::SeqCst) - 1;
        crate::observability::metrics::set_open_connections(self.id.kind, open);
        tracing::debug!(connection_id = %self.id, open, "Connection closed");
    }
}
