//! Game Logic Module
//!
//! All duel simulation code. 100% deterministic: no clocks, no randomness,
//! no I/O.
//!
//! ## Module Structure
//!
//! - `moves`: Seats, stances, the move vocabulary and commands
//! - `state`: Arena config, player state, snapshots and deltas
//! - `round`: The six-phase round resolution and its undo
//! - `events`: Round events for logs and replays
//! - `turn`: Turn coordinator with staging buffer and history
//! - `record`: Match records for replay verification

pub mod moves;
pub mod state;
pub mod round;
pub mod events;
pub mod turn;
pub mod record;

// Re-export key types
pub use moves::{Command, Move, MoveCategory, Seat, Stance, UnknownMove};
pub use state::{ArenaConfig, ArenaState, Delta, PlayerSnapshot, PlayerState};
pub use round::replay_rounds;
pub use events::{RoundEvent, RoundEventData, RoundPhase};
pub use turn::{Game, HistoryEntry, MatchOutcome, SubmissionState};
pub use record::{MatchRecord, ReplayError};
