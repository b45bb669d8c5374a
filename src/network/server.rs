//! Authoritative Server
//!
//! Owns the canonical `Game`, applies client submissions and produces the
//! broadcast every replica must replay. The server never resolves a round
//! twice and never broadcasts a round that did not resolve.
//!
//! Delivery is assumed at-least-once, so `selectMove` is filtered before
//! it reaches the game:
//!
//! - a `round` other than the one being staged is stale
//! - a seat whose slot is already filled is a duplicate
//! - anything after the match is decided is ignored
//!
//! `undoMove` names the round it rewinds, so a redelivered request finds
//! that round already gone and is dropped. Broadcasts carry their round
//! for the same reason on the replica side.

use tracing::{info, debug, instrument};

use crate::core::hash::to_hex;
use crate::game::moves::Command;
use crate::game::state::ArenaConfig;
use crate::game::turn::Game;
use crate::network::protocol::{ClientEvent, ServerEvent, Submission};

/// The single authority of a match.
#[derive(Debug, Clone)]
pub struct Server {
    game: Game,
    verify_hash: bool,
}

impl Server {
    /// Create a server with a fresh game.
    pub fn new(config: ArenaConfig) -> Self {
        Self::with_game(Game::new(config))
    }

    /// Create a server around an existing game.
    pub fn with_game(game: Game) -> Self {
        Self {
            game,
            verify_hash: false,
        }
    }

    /// Attach the post-round state hash to every `applyMoves`.
    pub fn with_hash_verification(mut self, enabled: bool) -> Self {
        self.verify_hash = enabled;
        self
    }

    /// Canonical game.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Handle one event. The returned event, if any, must be broadcast to
    /// every client.
    #[instrument(skip(self), fields(round = self.game.round()))]
    pub fn handle(&mut self, event: ServerEvent) -> Option<ClientEvent> {
        match event {
            ServerEvent::SelectMove { submission, round } => self.select_move(&submission, round),
            ServerEvent::UndoMove { round } => self.undo_move(round),
        }
    }

    fn select_move(&mut self, submission: &Submission, round: Option<u32>) -> Option<ClientEvent> {
        if let Some(outcome) = self.game.outcome() {
            debug!(?outcome, "Match decided, dropping submission");
            return None;
        }

        let staging = self.game.round() + 1;
        if let Some(round) = round {
            if round != staging {
                debug!(round, staging, "Dropping stale submission");
                return None;
            }
        }

        let mut accepted: Vec<Command> = Vec::with_capacity(2);
        for cmd in submission.commands() {
            let already_staged = accepted.iter().any(|c| c.seat == cmd.seat);
            if already_staged || !self.game.is_awaiting(cmd.seat) {
                debug!(seat = %cmd.seat, "Dropping duplicate submission");
                continue;
            }
            accepted.push(*cmd);
        }

        if accepted.is_empty() || !self.game.apply_moves(&accepted) {
            return None;
        }

        let entry = self.game.history().last()?;
        let moves = entry.commands;
        let round = self.game.round();
        let state_hash = self.verify_hash.then(|| to_hex(&self.game.state_hash()));

        info!(
            "Round {} resolved: {} / {}",
            round,
            moves[0],
            moves[1],
        );
        if let Some(outcome) = self.game.outcome() {
            info!(?outcome, "Match decided");
        }

        Some(ClientEvent::ApplyMoves {
            moves,
            round: Some(round),
            state_hash,
        })
    }

    fn undo_move(&mut self, round: Option<u32>) -> Option<ClientEvent> {
        let rewound = self.game.round();
        if let Some(round) = round {
            if round != rewound {
                debug!(round, current = rewound, "Dropping stale undo");
                return None;
            }
        }

        if !self.game.undo() {
            debug!("Nothing to undo");
            return None;
        }

        info!("Rewound to round {}", self.game.round());
        Some(ClientEvent::UndoMoves { round: Some(rewound) })
    }
}
