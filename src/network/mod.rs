//! Network Layer
//!
//! Authority, replicas and the plumbing between them.
//! This layer is **non-deterministic** (IO, tasks); every state change goes
//! through `game/`.
//!
//! - `protocol`: Envelope and event wire format
//! - `server`: The authoritative `Server`
//! - `client`: Client replicas and input staging
//! - `router`: Process-level `Context` that routes envelopes
//! - `transport`: Transport trait and the mpsc channel transport
//! - `socket`: WebSocket peer link

pub mod protocol;
pub mod server;
pub mod client;
pub mod router;
pub mod transport;
pub mod socket;

pub use protocol::{ClientEvent, Envelope, ProtocolError, ServerEvent, Submission, Target};
pub use server::Server;
pub use client::{Client, ClientError, Selection};
pub use router::{Context, Role, RoutingError};
pub use transport::{channel_pair, ChannelEndpoint, ChannelTransport, Transport, TransportError};
pub use socket::{PeerLink, SocketError};
