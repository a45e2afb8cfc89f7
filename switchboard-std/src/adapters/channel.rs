//! Connection backed by a bounded tokio channel.
//!
//! The transport owns the receiving half and pumps frames into its socket;
//! the router only ever sees the sending half.

use bytes::Bytes;
use switchboard_core::Connection;
use tokio::sync::mpsc;

/// A connection whose frames go into an `mpsc` channel.
///
/// `send` never blocks: a full or closed channel reports failure.
#[derive(Debug, Clone)]
pub struct ChannelConnection {
    id: String,
    tx: mpsc::Sender<Bytes>,
}

impl ChannelConnection {
    /// Create a connection and the receiver its frames arrive on.
    pub fn new(id: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { id: id.into(), tx }, rx)
    }

    /// Whether the receiving half is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Connection for ChannelConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, frame: Bytes) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(connection_id = %self.id, "channel full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
