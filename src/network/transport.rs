//! Transport Abstraction
//!
//! The routing layer only needs to push serialized frames out; inbound
//! frames are handed to `Context::on_message` by whoever owns the receive
//! side. `ChannelTransport` is the in-process implementation over tokio
//! mpsc channels, also used as the bridge into the WebSocket tasks.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Default frames buffered per direction.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The receiving side has gone away.
    #[error("Transport channel closed")]
    Closed,

    /// The receiving side is not keeping up.
    #[error("Transport channel full")]
    Full,
}

/// Outbound half of a bidirectional message channel.
///
/// Implementations must preserve ordering per sender.
pub trait Transport: Send {
    /// Queue one frame for delivery.
    fn send(&self, frame: String) -> Result<(), TransportError>;
}

/// Transport over a bounded tokio mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    outbound: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Wrap an existing sender.
    pub fn new(outbound: mpsc::Sender<String>) -> Self {
        Self { outbound }
    }

    /// Whether the other side has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

/// One side of a connected channel pair.
#[derive(Debug)]
pub struct ChannelEndpoint {
    /// Frames sent from this side.
    pub transport: ChannelTransport,
    /// Frames arriving from the other side.
    pub inbound: mpsc::Receiver<String>,
}

/// Two endpoints wired to each other, for same-process peers and tests.
pub fn channel_pair(capacity: usize) -> (ChannelEndpoint, ChannelEndpoint) {
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);

    let a = ChannelEndpoint {
        transport: ChannelTransport::new(a_tx),
        inbound: b_rx,
    };
    let b = ChannelEndpoint {
        transport: ChannelTransport::new(b_tx),
        inbound: a_rx,
    };
    (a, b)
}
