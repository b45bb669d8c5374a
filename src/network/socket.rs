//! WebSocket Peer Link
//!
//! Connects two processes over a single WebSocket and bridges it onto a
//! pair of mpsc channels, so the routing layer stays synchronous. The
//! hosting side binds and waits for exactly one peer; the joining side
//! dials a URL.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, connect_async, WebSocketStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn, error, debug, instrument};

use crate::network::transport::ChannelTransport;

/// Peer link errors.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// Failed to bind or accept.
    #[error("Failed to bind: {0}")]
    Io(#[from] std::io::Error),

    /// Handshake or stream failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// An established link to the other process.
#[derive(Debug)]
pub struct PeerLink {
    /// Where the other side is.
    pub remote: String,
    /// Frames to send to the peer.
    pub transport: ChannelTransport,
    /// Frames received from the peer, in arrival order.
    pub inbound: mpsc::Receiver<String>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl PeerLink {
    /// Split into the transport and inbound halves.
    ///
    /// The IO tasks keep running until either side closes.
    pub fn into_parts(self) -> (ChannelTransport, mpsc::Receiver<String>) {
        (self.transport, self.inbound)
    }

    /// Stop both IO tasks.
    pub fn abort(&self) {
        self.writer.abort();
        self.reader.abort();
    }
}

/// Bind to an address and wait for one peer to connect.
#[instrument]
pub async fn host(bind_addr: SocketAddr, capacity: usize) -> Result<PeerLink, SocketError> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!("Waiting for peer on {}", listener.local_addr()?);

    let (stream, addr) = listener.accept().await?;
    info!("Peer connected from {}", addr);

    let ws_stream = accept_async(stream).await?;
    Ok(bridge(ws_stream, addr.to_string(), capacity))
}

/// Connect to a hosting peer.
#[instrument]
pub async fn join(url: &str, capacity: usize) -> Result<PeerLink, SocketError> {
    let (ws_stream, _response) = connect_async(url).await?;
    info!("Connected to {}", url);
    Ok(bridge(ws_stream, url.to_string(), capacity))
}

/// Spawn the writer and reader tasks for an upgraded stream.
fn bridge<S>(ws_stream: WebSocketStream<S>, remote: String, capacity: usize) -> PeerLink
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(capacity);
    let (in_tx, in_rx) = mpsc::channel::<String>(capacity);

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(frame)).await {
                error!("Failed to send frame: {}", e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let reader_remote = remote.clone();
    let reader = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            let frame = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("Dropping non-UTF-8 binary frame from {}", reader_remote);
                        continue;
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Peer {} closed the connection", reader_remote);
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("WebSocket error for {}: {}", reader_remote, e);
                    break;
                }
            };

            if in_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    PeerLink {
        remote,
        transport: ChannelTransport::new(out_tx),
        inbound: in_rx,
        writer,
        reader,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::transport::Transport;

    #[tokio::test]
    async fn test_host_and_join_exchange_frames() {
        // Reserve a free port, then hand it to the host.
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let host_task = tokio::spawn(async move { host(addr, 8).await });
        let url = format!("ws://{}", addr);

        let mut joined = None;
        for _ in 0..50 {
            match join(&url, 8).await {
                Ok(link) => {
                    joined = Some(link);
                    break;
                }
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
            }
        }
        let mut peer = joined.expect("peer should connect");
        let mut hosted = host_task.await.unwrap().unwrap();

        peer.transport.send("from peer".to_string()).unwrap();
        hosted.transport.send("from host".to_string()).unwrap();

        assert_eq!(hosted.inbound.recv().await.as_deref(), Some("from peer"));
        assert_eq!(peer.inbound.recv().await.as_deref(), Some("from host"));

        peer.abort();
        hosted.abort();
    }
}
