//! In-memory [`Outbound`] used by unit tests.

use std::sync::Arc;

use hermes_ws::{ConnectionId, WsError, WsResult};
use tokio::sync::mpsc;

use crate::outbound::Outbound;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Record,
    Fail,
    Stall,
}

/// Records every delivered frame on an unbounded channel.
#[derive(Debug, Clone)]
pub(crate) struct RecordingOutbound {
    id: ConnectionId,
    behavior: Behavior,
    tx: Arc<mpsc::UnboundedSender<String>>,
}

impl RecordingOutbound {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        Self::with_behavior(Behavior::Record)
    }

    /// Every send fails as if the peer had gone away.
    pub(crate) fn closed() -> (Self, mpsc::UnboundedReceiver<String>) {
        Self::with_behavior(Behavior::Fail)
    }

    /// Every send hangs forever.
    pub(crate) fn stalled() -> (Self, mpsc::UnboundedReceiver<String>) {
        Self::with_behavior(Behavior::Stall)
    }

    fn with_behavior(behavior: Behavior) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbound = Self {
            id: ConnectionId::new(),
            behavior,
            tx: Arc::new(tx),
        };
        (outbound, rx)
    }
}

impl Outbound for RecordingOutbound {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send_text(&self, text: String) -> WsResult<()> {
        match self.behavior {
            Behavior::Record => self
                .tx
                .send(text)
                .map_err(|_| WsError::connection_closed("receiver dropped")),
            Behavior::Fail => Err(WsError::connection_closed("peer gone")),
            Behavior::Stall => std::future::pending().await,
        }
    }
}
