//! Connection handle shared between the socket loop and the core
//!
//! Every connection owns a bounded FIFO outbound queue. Only the socket loop
//! drains it, so frames for one connection are written one at a time and in
//! the order they were queued.

use crate::error::CLOSE_POLICY_VIOLATION;
use crate::types::ConnectionId;
use axum::extract::ws::Utf8Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Default number of frames that may wait in a connection's outbound queue
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// A frame waiting to be written to the socket. Text is reference counted,
/// so one serialized message can sit in many queues.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(Utf8Bytes),
    Close { code: u16, reason: String },
}

#[derive(Debug)]
struct Shared {
    closed: AtomicBool,
    evicted: Notify,
}

/// Cheap, cloneable handle to one live client channel
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbox: mpsc::Sender<Outbound>,
    shared: Arc<Shared>,
}

impl Connection {
    /// Create a handle and the receiving end of its outbound queue
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (outbox, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id: ulid::Ulid::new().to_string(),
            outbox,
            shared: Arc::new(Shared {
                closed: AtomicBool::new(false),
                evicted: Notify::new(),
            }),
        };
        (conn, rx)
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn is_open(&self) -> bool {
        !self.shared.closed.load(Ordering::Acquire) && !self.outbox.is_closed()
    }

    /// Queue a text frame. Returns false if the frame was dropped.
    ///
    /// A full queue means the client is not keeping up; the connection is
    /// evicted rather than buffering without bound.
    pub fn send(&self, text: impl Into<Utf8Bytes>) -> bool {
        if !self.is_open() {
            return false;
        }

        match self.outbox.try_send(Outbound::Text(text.into())) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Outbound queue full for connection {}, evicting", self.id);
                self.evict();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Queue a close frame after everything already queued. Later sends are dropped.
    pub fn close(&self, code: u16, reason: &str) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let frame = Outbound::Close {
            code,
            reason: reason.to_string(),
        };
        if self.outbox.try_send(frame).is_err() {
            // No room for the close frame: have the socket loop close directly.
            self.shared.evicted.notify_one();
        }
    }

    fn evict(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.evicted.notify_one();
    }

    /// Resolves once the connection has been evicted for falling behind
    pub async fn evicted(&self) {
        self.shared.evicted.notified().await;
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

/// Close status and reason used when a slow connection is evicted
pub fn eviction_frame() -> Outbound {
    Outbound::Close {
        code: CLOSE_POLICY_VIOLATION,
        reason: "outbound queue full".to_string(),
    }
}
