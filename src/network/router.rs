//! Routing Context
//!
//! The process-level owner of everything in a match: an optional `Server`
//! (exactly one process per match hosts it), the local `Client`s and an
//! optional transport to the other process.
//!
//! ## Flow
//!
//! ```text
//! submit ─▶ selectMove ─┬─ server is local ──▶ inbound queue
//!                       └─ server is remote ─▶ transport
//!
//! tick ─▶ drain inbound ─┬─ target=server ─▶ Server::handle ─▶ broadcast
//!                        └─ target=client ─▶ every local Client
//!
//! broadcast ─▶ every local Client, then transport
//! ```
//!
//! Local clients see a broadcast before it is forwarded, so a transport
//! that refuses the frame never leaves the host's replica behind its own
//! server.
//!
//! All mutation happens synchronously inside `tick`; frames that arrive
//! between ticks only sit in the queue.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{info, debug, warn, error, instrument};

use crate::config::DuelConfig;
use crate::game::moves::Seat;
use crate::network::client::{Client, ClientError, Selection};
use crate::network::protocol::{ClientEvent, Envelope, ProtocolError, ServerEvent};
use crate::network::server::Server;
use crate::network::transport::{Transport, TransportError};

/// Routing errors. All of them are fatal for the handler that hit them.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// A server-bound event reached a process that does not host the server.
    #[error("Received a server event but no server is hosted here")]
    MissingServer,

    /// No local client at this index.
    #[error("No local client {0}")]
    UnknownClient(usize),

    /// Frame could not be encoded or decoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A local client rejected an input or a broadcast.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// The transport refused a frame.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Which part of the match this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Hot-seat: server and both clients in one process.
    Local,
    /// Hosts the server and one client.
    Host,
    /// Hosts one client; the server is remote.
    Peer,
}

/// Process-level owner of the match.
pub struct Context {
    role: Role,
    server: Option<Server>,
    clients: Vec<Client>,
    transport: Option<Box<dyn Transport>>,
    inbound: VecDeque<Envelope>,
}

impl Context {
    /// Hot-seat match: one client per seat, no transport.
    pub fn local(config: &DuelConfig) -> Self {
        let clients = Seat::ALL
            .into_iter()
            .map(|seat| Client::for_seat(config.arena, seat).with_hash_verification(config.verify_hash))
            .collect();
        Self::build(Role::Local, Some(Self::authority(config)), clients, None)
    }

    /// Hosting side of a networked match. The local client takes seat 0.
    pub fn host(config: &DuelConfig, transport: Box<dyn Transport>) -> Self {
        let client = Client::for_seat(config.arena, Seat::First)
            .with_hash_verification(config.verify_hash);
        Self::build(Role::Host, Some(Self::authority(config)), vec![client], Some(transport))
    }

    /// Joining side of a networked match. The seat is assigned later with
    /// [`Context::assign_seat`].
    pub fn peer(config: &DuelConfig, transport: Box<dyn Transport>) -> Self {
        let client = Client::new(config.arena).with_hash_verification(config.verify_hash);
        Self::build(Role::Peer, None, vec![client], Some(transport))
    }

    fn authority(config: &DuelConfig) -> Server {
        Server::new(config.arena).with_hash_verification(config.verify_hash)
    }

    fn build(
        role: Role,
        server: Option<Server>,
        clients: Vec<Client>,
        transport: Option<Box<dyn Transport>>,
    ) -> Self {
        info!(?role, clients = clients.len(), "Context created");
        Self {
            role,
            server,
            clients,
            transport,
            inbound: VecDeque::new(),
        }
    }

    /// Part this process plays.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The hosted server, if any.
    pub fn server(&self) -> Option<&Server> {
        self.server.as_ref()
    }

    /// Local clients.
    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    /// A local client by index.
    pub fn client(&self, index: usize) -> Option<&Client> {
        self.clients.get(index)
    }

    /// A local client by index, mutably (for `has_updated`).
    pub fn client_mut(&mut self, index: usize) -> Option<&mut Client> {
        self.clients.get_mut(index)
    }

    /// Seat a local client once the transport reports our role.
    pub fn assign_seat(&mut self, index: usize, seat: Seat) -> Result<(), RoutingError> {
        self.clients
            .get_mut(index)
            .ok_or(RoutingError::UnknownClient(index))?
            .assign_seat(seat);
        Ok(())
    }

    /// Envelopes waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    /// Queue a frame from the transport.
    pub fn on_message(&mut self, frame: &str) -> Result<(), RoutingError> {
        let envelope = Envelope::from_json(frame)?;
        debug!(?envelope, "Frame received");
        self.inbound.push_back(envelope);
        Ok(())
    }

    /// Queue every frame currently waiting on a receiver.
    pub fn receive_from(&mut self, inbound: &mut mpsc::Receiver<String>) -> Result<usize, RoutingError> {
        let mut count = 0;
        while let Ok(frame) = inbound.try_recv() {
            self.on_message(&frame)?;
            count += 1;
        }
        Ok(count)
    }

    /// Feed an input to a local client and send what it produces.
    pub fn submit(&mut self, index: usize, selection: Selection) -> Result<(), RoutingError> {
        let client = self
            .clients
            .get_mut(index)
            .ok_or(RoutingError::UnknownClient(index))?;

        if let Some(event) = client.select(selection)? {
            self.send_to_server(event)?;
        }
        Ok(())
    }

    /// Ask the authority to rewind the last round on behalf of a client.
    pub fn request_undo(&mut self, index: usize) -> Result<(), RoutingError> {
        let event = self
            .clients
            .get(index)
            .ok_or(RoutingError::UnknownClient(index))?
            .request_undo();
        self.send_to_server(event)
    }

    fn send_to_server(&mut self, event: ServerEvent) -> Result<(), RoutingError> {
        let envelope = Envelope::Server(event);
        if self.server.is_some() {
            self.inbound.push_back(envelope);
            return Ok(());
        }

        match &self.transport {
            Some(transport) => transport.send(envelope.to_json()?)?,
            None => return Err(RoutingError::MissingServer),
        }
        Ok(())
    }

    /// Drain the inbound queue. Returns the number of envelopes routed.
    #[instrument(skip(self), fields(role = ?self.role))]
    pub fn tick(&mut self) -> Result<usize, RoutingError> {
        let mut routed = 0;
        while let Some(envelope) = self.inbound.pop_front() {
            if let Err(e) = self.route(envelope) {
                error!("Routing failed: {}", e);
                return Err(e);
            }
            routed += 1;
        }
        Ok(routed)
    }

    fn route(&mut self, envelope: Envelope) -> Result<(), RoutingError> {
        match envelope {
            Envelope::Server(event) => {
                let server = self.server.as_mut().ok_or(RoutingError::MissingServer)?;
                if let Some(broadcast) = server.handle(event) {
                    self.broadcast(broadcast)?;
                }
            }
            Envelope::Client(event) => self.deliver(event)?,
        }
        Ok(())
    }

    /// Send a server broadcast to local clients and across the transport.
    fn broadcast(&mut self, event: ClientEvent) -> Result<(), RoutingError> {
        let frame = match &self.transport {
            Some(_) => Some(Envelope::Client(event.clone()).to_json()?),
            None => None,
        };
        self.deliver(event)?;

        if let (Some(transport), Some(frame)) = (&self.transport, frame) {
            if let Err(e) = transport.send(frame) {
                warn!("Failed to forward broadcast: {}", e);
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn deliver(&mut self, event: ClientEvent) -> Result<(), RoutingError> {
        debug!(kind = event.kind(), "Delivering to {} client(s)", self.clients.len());
        for client in &mut self.clients {
            client.handle(event.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::moves::{Command, Move};
    use crate::network::protocol::Submission;
    use crate::network::transport::{channel_pair, ChannelEndpoint, TransportError};

    fn play(ctx: &mut Context, index: usize, mv: Move) {
        ctx.submit(index, Selection::Move(mv)).unwrap();
        ctx.submit(index, Selection::Submit).unwrap();
    }

    #[test]
    fn test_local_round_trip() {
        let mut ctx = Context::local(&DuelConfig::default());
        assert_eq!(ctx.role(), Role::Local);

        play(&mut ctx, 0, Move::Advance);
        assert_eq!(ctx.tick().unwrap(), 1);
        assert_eq!(ctx.client(0).unwrap().game().round(), 0);

        play(&mut ctx, 1, Move::ChangeStance);
        assert_eq!(ctx.tick().unwrap(), 1);

        let server_hash = ctx.server().unwrap().game().state_hash();
        for client in ctx.clients() {
            assert_eq!(client.game().round(), 1);
            assert_eq!(client.game().state_hash(), server_hash);
        }
        assert!(ctx.client_mut(1).unwrap().has_updated());
    }

    #[test]
    fn test_local_undo() {
        let mut ctx = Context::local(&DuelConfig::default());
        play(&mut ctx, 0, Move::Charge);
        play(&mut ctx, 1, Move::Retreat);
        ctx.tick().unwrap();

        ctx.request_undo(1).unwrap();
        ctx.tick().unwrap();
        for client in ctx.clients() {
            assert_eq!(client.game().round(), 0);
        }

        // Nothing left: no broadcast, no error.
        ctx.request_undo(0).unwrap();
        assert_eq!(ctx.tick().unwrap(), 1);
    }

    #[test]
    fn test_server_event_without_server_is_fatal() {
        let (endpoint, _other) = channel_pair(8);
        let mut ctx = Context::peer(&DuelConfig::default(), Box::new(endpoint.transport));

        ctx.on_message(r#"{"target":"server","event":{"type":"undoMove"}}"#).unwrap();
        assert!(matches!(ctx.tick(), Err(RoutingError::MissingServer)));
    }

    #[test]
    fn test_bad_frame_rejected() {
        let mut ctx = Context::local(&DuelConfig::default());
        assert!(matches!(ctx.on_message("{}"), Err(RoutingError::Protocol(_))));
        assert_eq!(ctx.pending(), 0);
    }

    #[test]
    fn test_unknown_client() {
        let mut ctx = Context::local(&DuelConfig::default());
        assert!(matches!(
            ctx.submit(5, Selection::Submit),
            Err(RoutingError::UnknownClient(5))
        ));
    }

    #[test]
    fn test_host_and_peer_over_channels() {
        let config = DuelConfig::default();
        let (host_end, peer_end) = channel_pair(16);
        let ChannelEndpoint { transport: host_tx, inbound: mut host_rx } = host_end;
        let ChannelEndpoint { transport: peer_tx, inbound: mut peer_rx } = peer_end;

        let mut host = Context::host(&config, Box::new(host_tx));
        let mut peer = Context::peer(&config, Box::new(peer_tx));
        peer.assign_seat(0, Seat::Second).unwrap();

        let rounds = [
            (Move::Advance, Move::Advance),
            (Move::NeutralAttack, Move::SwitchAttack),
            (Move::ChangeStance, Move::Retreat),
        ];
        for (host_move, peer_move) in rounds {
            play(&mut peer, 0, peer_move);
            play(&mut host, 0, host_move);

            host.receive_from(&mut host_rx).unwrap();
            host.tick().unwrap();
            peer.receive_from(&mut peer_rx).unwrap();
            peer.tick().unwrap();
        }

        let authority = host.server().unwrap().game();
        assert_eq!(authority.round(), 3);
        assert_eq!(host.client(0).unwrap().game().state_hash(), authority.state_hash());
        assert_eq!(peer.client(0).unwrap().game().state_hash(), authority.state_hash());
    }

    #[test]
    fn test_full_transport_keeps_host_replica_in_step() {
        let (host_end, peer_end) = channel_pair(1);
        let mut host = Context::host(&DuelConfig::default(), Box::new(host_end.transport));
        let ChannelEndpoint { inbound: mut peer_rx, .. } = peer_end;

        let peer_frame = |round| {
            let submission = Submission::One(Command::new(Seat::Second, Move::ChangeStance));
            Envelope::from(ServerEvent::select(submission, round)).to_json().unwrap()
        };

        // Round 1 fills the peer's only slot.
        play(&mut host, 0, Move::Advance);
        host.on_message(&peer_frame(1)).unwrap();
        host.tick().unwrap();

        // Round 2 cannot be forwarded.
        play(&mut host, 0, Move::Retreat);
        host.on_message(&peer_frame(2)).unwrap();
        assert!(matches!(
            host.tick(),
            Err(RoutingError::Transport(TransportError::Full))
        ));

        let authority = host.server().unwrap().game();
        assert_eq!(authority.round(), 2);
        assert_eq!(host.client(0).unwrap().game().round(), 2);
        assert_eq!(host.client(0).unwrap().game().state_hash(), authority.state_hash());

        assert!(peer_rx.try_recv().is_ok());
        assert!(peer_rx.try_recv().is_err());
    }

    #[test]
    fn test_redelivered_frames_do_not_replay() {
        let config = DuelConfig::default();
        let (host_end, peer_end) = channel_pair(16);
        let ChannelEndpoint { transport: host_tx, inbound: mut host_rx } = host_end;
        let ChannelEndpoint { transport: peer_tx, inbound: mut peer_rx } = peer_end;

        let mut host = Context::host(&config, Box::new(host_tx));
        let mut peer = Context::peer(&config, Box::new(peer_tx));
        peer.assign_seat(0, Seat::Second).unwrap();

        for _ in 0..2 {
            play(&mut peer, 0, Move::ChangeStance);
            play(&mut host, 0, Move::Advance);
            host.receive_from(&mut host_rx).unwrap();
            host.tick().unwrap();

            // The broadcast reaches the peer twice.
            let frame = peer_rx.try_recv().unwrap();
            peer.on_message(&frame).unwrap();
            peer.on_message(&frame).unwrap();
            assert_eq!(peer.tick().unwrap(), 2);
        }

        let authority = host.server().unwrap().game();
        assert_eq!(peer.client(0).unwrap().game().state(), authority.state());

        // One undo request, delivered twice, rewinds one round.
        peer.request_undo(0).unwrap();
        let request = host_rx.try_recv().unwrap();
        host.on_message(&request).unwrap();
        host.on_message(&request).unwrap();
        host.tick().unwrap();
        assert_eq!(host.server().unwrap().game().round(), 1);

        peer.receive_from(&mut peer_rx).unwrap();
        peer.tick().unwrap();
        assert_eq!(peer.client(0).unwrap().game().round(), 1);
        assert_eq!(
            peer.client(0).unwrap().game().state_hash(),
            host.server().unwrap().game().state_hash()
        );
    }
}
