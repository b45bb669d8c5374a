//! Client Replica
//!
//! A client never decides anything: it stages the local player's choices,
//! turns them into a `selectMove` for the authority, and replays whatever
//! the authority broadcasts on its own `Game`. Because the simulation is
//! deterministic, replaying the same commands keeps the replica identical
//! to the server.
//!
//! Broadcasts for a round the replica is not at are redelivered copies
//! and are dropped without touching the game.
//!
//! A client controls either one seat (networked play, assigned once the
//! transport reports a role) or both seats (a single hot-seat client).

use tracing::{debug, warn, instrument};

use crate::core::hash::to_hex;
use crate::game::moves::{Command, Move, Seat};
use crate::game::state::ArenaConfig;
use crate::game::turn::Game;
use crate::network::protocol::{ClientEvent, ServerEvent, Submission};

/// Client errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// No seat has been assigned yet.
    #[error("No seat assigned")]
    NoSeat,

    /// A controlled slot has no move selected.
    #[error("Selection incomplete: no move chosen for {0}")]
    IncompleteSelection(Seat),

    /// This round's intent has already been sent.
    #[error("Already submitted for round {0}")]
    AlreadySubmitted(u32),

    /// A broadcast round did not resolve on the replica.
    #[error("Desync: round {0} did not resolve locally")]
    Desync(u32),

    /// A broadcast undo found nothing to rewind.
    #[error("Desync: undo with empty history at round {0}")]
    UndoDesync(u32),

    /// The replica hash differs from the authority's.
    #[error("State hash mismatch at round {round}: server {expected}, replica {actual}")]
    HashMismatch {
        round: u32,
        expected: String,
        actual: String,
    },
}

/// Input from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Pick (or un-pick) a move.
    Move(Move),
    /// Send the staged moves.
    Submit,
}

/// Which seats a client speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Seat(Option<Seat>),
    HotSeat,
}

/// A replica of the match plus local input staging.
#[derive(Debug, Clone)]
pub struct Client {
    game: Game,
    control: Control,
    selected_moves: [Option<Move>; 2],
    /// Round the last submission was aimed at
    submitted_round: Option<u32>,
    verify_hash: bool,
    updated: bool,
}

impl Client {
    /// Single-seat client, seat unassigned.
    pub fn new(config: ArenaConfig) -> Self {
        Self::with_game(Game::new(config), Control::Seat(None))
    }

    /// Single-seat client with a known seat.
    pub fn for_seat(config: ArenaConfig, seat: Seat) -> Self {
        Self::with_game(Game::new(config), Control::Seat(Some(seat)))
    }

    /// Client that controls both seats from one input device.
    pub fn hot_seat(config: ArenaConfig) -> Self {
        Self::with_game(Game::new(config), Control::HotSeat)
    }

    fn with_game(game: Game, control: Control) -> Self {
        Self {
            game,
            control,
            selected_moves: [None, None],
            submitted_round: None,
            verify_hash: true,
            updated: false,
        }
    }

    /// Check `stateHash` on broadcasts that carry one.
    pub fn with_hash_verification(mut self, enabled: bool) -> Self {
        self.verify_hash = enabled;
        self
    }

    /// Take a seat once the transport reports our role.
    ///
    /// Has no effect on a hot-seat client.
    pub fn assign_seat(&mut self, seat: Seat) {
        if let Control::Seat(slot) = &mut self.control {
            debug!(%seat, "Seat assigned");
            *slot = Some(seat);
        }
    }

    /// Assigned seat of a single-seat client.
    pub fn seat(&self) -> Option<Seat> {
        match self.control {
            Control::Seat(seat) => seat,
            Control::HotSeat => None,
        }
    }

    /// Whether this client controls both seats.
    pub fn is_hot_seat(&self) -> bool {
        self.control == Control::HotSeat
    }

    /// Seats whose moves this client stages, in seat order.
    pub fn controlled_seats(&self) -> Vec<Seat> {
        match self.control {
            Control::Seat(Some(seat)) => vec![seat],
            Control::Seat(None) => Vec::new(),
            Control::HotSeat => Seat::ALL.to_vec(),
        }
    }

    /// Replica game, for presentation.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Staged move for a seat.
    pub fn selected(&self, seat: Seat) -> Option<Move> {
        self.selected_moves[seat.index()]
    }

    /// Whether an intent for the upcoming round is in flight.
    pub fn has_submitted(&self) -> bool {
        self.submitted_round == Some(self.game.round() + 1)
    }

    /// Whether the replica changed since the last call. Edge-triggered.
    pub fn has_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }

    /// Apply one input from the presentation layer.
    ///
    /// Returns the event to send when the selection submits.
    pub fn select(&mut self, selection: Selection) -> Result<Option<ServerEvent>, ClientError> {
        match selection {
            Selection::Move(mv) => {
                self.toggle(mv)?;
                Ok(None)
            }
            Selection::Submit => self.submit_moves(),
        }
    }

    /// Selecting a move already staged in a controlled slot clears it;
    /// otherwise it fills the first empty controlled slot, or replaces
    /// the last one when all are full.
    fn toggle(&mut self, mv: Move) -> Result<(), ClientError> {
        let seats = self.controlled_seats();
        let Some(last) = seats.last().copied() else {
            return Err(ClientError::NoSeat);
        };

        if let Some(seat) = seats.iter().find(|s| self.selected(**s) == Some(mv)) {
            self.selected_moves[seat.index()] = None;
            return Ok(());
        }

        let target = seats
            .iter()
            .copied()
            .find(|s| self.selected(*s).is_none())
            .unwrap_or(last);
        self.selected_moves[target.index()] = Some(mv);
        Ok(())
    }

    /// Turn the staged moves into a `selectMove` and clear staging.
    ///
    /// `Ok(None)` once the match is decided.
    #[instrument(skip(self), fields(round = self.game.round() + 1))]
    pub fn submit_moves(&mut self) -> Result<Option<ServerEvent>, ClientError> {
        let seats = self.controlled_seats();
        if seats.is_empty() {
            return Err(ClientError::NoSeat);
        }
        if self.game.is_over() {
            debug!("Match decided, nothing to submit");
            return Ok(None);
        }

        let round = self.game.round() + 1;
        if self.submitted_round == Some(round) {
            return Err(ClientError::AlreadySubmitted(round));
        }

        let mut commands = Vec::with_capacity(seats.len());
        for seat in seats {
            let mv = self.selected(seat).ok_or(ClientError::IncompleteSelection(seat))?;
            commands.push(Command::new(seat, mv));
        }

        let Some(submission) = Submission::from_commands(&commands) else {
            return Err(ClientError::NoSeat);
        };

        self.selected_moves = [None, None];
        self.submitted_round = Some(round);
        debug!(?commands, "Submitting");
        Ok(Some(ServerEvent::select(submission, round)))
    }

    /// Ask the authority to rewind the last round the replica has seen.
    pub fn request_undo(&self) -> ServerEvent {
        ServerEvent::undo(self.game.round())
    }

    /// Replay a broadcast on the replica.
    ///
    /// A round that fails its hash check is rewound before the error is
    /// returned, so the replica stays at the last agreed round.
    pub fn handle(&mut self, event: ClientEvent) -> Result<(), ClientError> {
        match event {
            ClientEvent::ApplyMoves { moves, round, state_hash } => {
                let next = self.game.round() + 1;
                if round.is_some_and(|round| round != next) {
                    debug!(?round, next, "Dropping stale applyMoves");
                    return Ok(());
                }

                if !self.game.apply_moves(&moves) {
                    return Err(ClientError::Desync(next));
                }

                if let (true, Some(expected)) = (self.verify_hash, state_hash) {
                    let actual = to_hex(&self.game.state_hash());
                    if actual != expected {
                        warn!(round = next, "Replica diverged from server");
                        self.game.undo();
                        return Err(ClientError::HashMismatch {
                            round: next,
                            expected,
                            actual,
                        });
                    }
                }
            }
            ClientEvent::UndoMoves { round } => {
                let current = self.game.round();
                if round.is_some_and(|round| round != current) {
                    debug!(?round, current, "Dropping stale undoMoves");
                    return Ok(());
                }

                if !self.game.undo() {
                    return Err(ClientError::UndoDesync(self.game.round()));
                }
            }
        }

        self.submitted_round = None;
        self.updated = true;
        Ok(())
    }
}
