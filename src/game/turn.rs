//! Turn Coordinator
//!
//! Buffers per-seat intents until both are present, resolves the round and
//! keeps the history needed for undo and replay.
//!
//! ## Submission discipline
//!
//! Simultaneous-blind: each seat fills its own slot independently and the
//! round resolves the moment both slots are filled. Both slots are then
//! cleared, so there is no inherent turn order.
//!
//! ```text
//! Empty ──stage──▶ OneSubmitted ──stage──▶ BothSubmitted ──resolve──▶ Empty
//! ```

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::game::events::RoundEvent;
use crate::game::moves::{Command, Seat};
use crate::game::state::{ArenaConfig, ArenaState, Delta, PlayerState};

/// One resolved round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Commands in seat order
    pub commands: [Command; 2],
    /// Snapshots captured around the round
    pub delta: Delta,
}

/// How a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// The other seat was knocked out.
    Winner(Seat),
    /// Both seats went down in the same round.
    Draw,
}

/// Progress of the staging buffer for the upcoming round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    /// No intents staged.
    Empty,
    /// Exactly one seat has submitted.
    OneSubmitted(Seat),
}

/// Match state plus its command log.
#[derive(Clone, Debug)]
pub struct Game {
    /// Canonical arena
    state: ArenaState,
    /// Resolved rounds, oldest first
    history: Vec<HistoryEntry>,
    /// Staged intents, indexed by seat
    next_commands: [Option<Command>; 2],
    /// Events from the most recent round
    last_events: Vec<RoundEvent>,
}

impl Game {
    /// Create a game with both players at their spawn positions.
    pub fn new(config: ArenaConfig) -> Self {
        Self::from_state(ArenaState::new(config))
    }

    /// Create a game around an existing arena.
    pub fn from_state(state: ArenaState) -> Self {
        Self {
            state,
            history: Vec::new(),
            next_commands: [None, None],
            last_events: Vec::new(),
        }
    }

    /// Stage one or more commands and resolve the round if it is complete.
    ///
    /// A command for a seat that already has an intent staged replaces it.
    /// Returns `true` only if a round resolved; callers must not broadcast
    /// anything on `false`.
    pub fn apply_moves(&mut self, commands: &[Command]) -> bool {
        for cmd in commands {
            self.next_commands[cmd.seat.index()] = Some(*cmd);
        }

        let [Some(first), Some(second)] = self.next_commands else {
            return false;
        };

        let commands = [first, second];
        let delta = self.state.apply(commands);
        self.last_events = self.state.take_events();
        self.history.push(HistoryEntry { commands, delta });
        self.next_commands = [None, None];
        true
    }

    /// Rewind the most recent round.
    ///
    /// Any partially staged round is discarded as well. Returns `false` on
    /// an empty history, leaving everything untouched.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.pop() else {
            return false;
        };

        self.state.undo(&entry.delta);
        self.next_commands = [None, None];
        self.last_events.clear();
        true
    }

    /// Current arena.
    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    /// Get a player by seat.
    pub fn get_player(&self, seat: Seat) -> &PlayerState {
        self.state.player(seat)
    }

    /// Number of resolved rounds.
    pub fn round(&self) -> u32 {
        self.state.round
    }

    /// Resolved rounds, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Command lists of every resolved round, for replay.
    pub fn rounds(&self) -> Vec<[Command; 2]> {
        self.history.iter().map(|entry| entry.commands).collect()
    }

    /// Whether a seat still owes an intent for the upcoming round.
    pub fn is_awaiting(&self, seat: Seat) -> bool {
        self.next_commands[seat.index()].is_none()
    }

    /// Staged intent of a seat, if any.
    pub fn staged(&self, seat: Seat) -> Option<Command> {
        self.next_commands[seat.index()]
    }

    /// First seat still awaiting an intent.
    ///
    /// Under simultaneous submission both seats are open at the start of a
    /// round, so this reports seat 0 until it has submitted.
    pub fn active_player(&self) -> Option<Seat> {
        Seat::ALL.into_iter().find(|seat| self.is_awaiting(*seat))
    }

    /// Progress of the staging buffer.
    pub fn submission_state(&self) -> SubmissionState {
        match self.next_commands {
            [Some(cmd), None] | [None, Some(cmd)] => SubmissionState::OneSubmitted(cmd.seat),
            _ => SubmissionState::Empty,
        }
    }

    /// Command a seat played in the most recent round.
    pub fn last_command(&self, seat: Seat) -> Option<Command> {
        self.history.last().map(|entry| entry.commands[seat.index()])
    }

    /// Events produced by the most recent round.
    pub fn last_events(&self) -> &[RoundEvent] {
        &self.last_events
    }

    /// Result of the match, once a seat has been knocked out.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        match self.state.knocked_out().as_slice() {
            [] => None,
            [loser] => Some(MatchOutcome::Winner(loser.opponent())),
            _ => Some(MatchOutcome::Draw),
        }
    }

    /// Whether the match has been decided.
    pub fn is_over(&self) -> bool {
        self.outcome().is_some()
    }

    /// Hash of the arena for replica verification.
    pub fn state_hash(&self) -> StateHash {
        self.state.compute_hash()
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}
