//! Match Records
//!
//! Everything needed to deterministically re-run a match and check that
//! it ends where the authority said it did. Records carry a state hash
//! after every round so a divergence is pinned to the round it happened in.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::hash::{StateHash, StateHasher, to_hex};
use crate::game::moves::Command;
use crate::game::state::{ArenaConfig, ArenaState};
use crate::game::turn::Game;

/// Current record format version.
pub const RECORD_VERSION: u8 = 1;

/// Errors raised while replaying a record.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// JSON record did not decode.
    #[error("failed to decode record: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary record did not decode.
    #[error("failed to decode binary record: {0}")]
    Binary(#[from] bincode::Error),

    /// Record written by an incompatible format.
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u8),

    /// Recorded rules describe an unplayable match.
    #[error("unplayable config: arena size {arena_size}, starting health {starting_health}")]
    InvalidConfig {
        arena_size: i32,
        starting_health: u32,
    },

    /// A recorded round was missing a seat.
    #[error("round {0} did not resolve: commands must cover both seats")]
    UnresolvedRound(usize),

    /// Replay diverged from a checkpoint.
    #[error("state hash mismatch after round {round}: expected {expected}, got {actual}")]
    HashMismatch {
        round: u32,
        expected: String,
        actual: String,
    },

    /// Replay ended on a different state.
    #[error("final state hash mismatch: expected {expected}, got {actual}")]
    FinalHashMismatch {
        expected: String,
        actual: String,
    },
}

/// A recorded match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Version for forward compatibility.
    pub version: u8,

    /// Unique match identifier.
    pub match_id: Uuid,

    /// When the record was taken. Not part of any hash.
    pub recorded_at: DateTime<Utc>,

    /// Rules the match was played under.
    pub config: ArenaConfig,

    /// Arena before the first round.
    pub initial_positions: [i32; 2],

    /// Resolved rounds in order, commands in seat order.
    pub rounds: Vec<[Command; 2]>,

    /// Arena hash after each round.
    pub checkpoints: Vec<StateHash>,

    /// Arena hash after the last round.
    pub final_hash: StateHash,
}

impl MatchRecord {
    /// Record a game's history.
    ///
    /// `initial` must be the arena the game started from.
    pub fn from_game(match_id: Uuid, initial: &ArenaState, game: &Game) -> Self {
        let mut checkpoints = Vec::with_capacity(game.history().len());
        let mut state = initial.clone();
        for entry in game.history() {
            state.apply(entry.commands);
            checkpoints.push(state.compute_hash());
        }

        Self {
            version: RECORD_VERSION,
            match_id,
            recorded_at: Utc::now(),
            config: initial.config,
            initial_positions: [initial.players[0].position, initial.players[1].position],
            rounds: game.rounds(),
            checkpoints,
            final_hash: game.state_hash(),
        }
    }

    /// Arena the match started from.
    pub fn initial_state(&self) -> ArenaState {
        ArenaState::with_positions(self.config, self.initial_positions)
    }

    /// Re-run every round and verify each checkpoint and the final hash.
    pub fn replay(&self) -> Result<Game, ReplayError> {
        if self.version != RECORD_VERSION {
            return Err(ReplayError::UnsupportedVersion(self.version));
        }
        if !self.config.is_playable() {
            return Err(ReplayError::InvalidConfig {
                arena_size: self.config.arena_size,
                starting_health: self.config.starting_health,
            });
        }

        let mut game = Game::from_state(self.initial_state());
        for (index, commands) in self.rounds.iter().enumerate() {
            if !game.apply_moves(commands) {
                return Err(ReplayError::UnresolvedRound(index));
            }

            if let Some(expected) = self.checkpoints.get(index) {
                let actual = game.state_hash();
                if actual != *expected {
                    return Err(ReplayError::HashMismatch {
                        round: game.round(),
                        expected: to_hex(expected),
                        actual: to_hex(&actual),
                    });
                }
            }
        }

        let actual = game.state_hash();
        if actual != self.final_hash {
            return Err(ReplayError::FinalHashMismatch {
                expected: to_hex(&self.final_hash),
                actual: to_hex(&actual),
            });
        }

        Ok(game)
    }

    /// Commitment over the match identity and its command log.
    ///
    /// Independent of `recorded_at`, so two records of the same match agree.
    pub fn commitment(&self) -> StateHash {
        let mut hasher = StateHasher::for_match_record();
        hasher.update_u8(self.version);
        hasher.update_bytes(self.match_id.as_bytes());
        hasher.update_i32(self.config.arena_size);
        hasher.update_u32(self.config.starting_health);
        for position in self.initial_positions {
            hasher.update_i32(position);
        }
        hasher.update_u32(self.rounds.len() as u32);
        for commands in &self.rounds {
            for cmd in commands {
                hasher.update_u8(cmd.seat.into());
                hasher.update_u8(cmd.mv as u8);
            }
        }
        hasher.update_bytes(&self.final_hash);
        hasher.finalize()
    }

    /// Decode a JSON record and replay it.
    pub fn verify_json(s: &str) -> Result<Game, ReplayError> {
        Self::from_json(s)?.replay()
    }

    /// Decode a binary record and replay it.
    pub fn verify_bytes(data: &[u8]) -> Result<Game, ReplayError> {
        Self::from_bytes(data)?.replay()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::moves::{Move, Seat};

    fn played_game() -> (ArenaState, Game) {
        let initial = ArenaState::new(ArenaConfig::default());
        let mut game = Game::from_state(initial.clone());
        let script = [
            (Move::Advance, Move::Advance),
            (Move::NeutralAttack, Move::ChangeStance),
            (Move::SwitchAttack, Move::Retreat),
        ];
        for (first, second) in script {
            assert!(game.apply_moves(&[
                Command::new(Seat::First, first),
                Command::new(Seat::Second, second),
            ]));
        }
        (initial, game)
    }

    #[test]
    fn test_replay_reaches_same_state() {
        let (initial, game) = played_game();
        let record = MatchRecord::from_game(Uuid::new_v4(), &initial, &game);

        assert_eq!(record.rounds.len(), 3);
        assert_eq!(record.checkpoints.len(), 3);

        let replayed = record.replay().unwrap();
        assert_eq!(replayed.state(), game.state());
        assert_eq!(replayed.history(), game.history());
    }

    #[test]
    fn test_tampered_round_is_detected() {
        let (initial, game) = played_game();
        let mut record = MatchRecord::from_game(Uuid::new_v4(), &initial, &game);
        record.rounds[1][0] = Command::new(Seat::First, Move::Retreat);

        match record.replay() {
            Err(ReplayError::HashMismatch { round, .. }) => assert_eq!(round, 2),
            other => panic!("expected hash mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_round_is_rejected() {
        let (initial, game) = played_game();
        let mut record = MatchRecord::from_game(Uuid::new_v4(), &initial, &game);
        record.rounds[0] = [
            Command::new(Seat::First, Move::Advance),
            Command::new(Seat::First, Move::Charge),
        ];

        assert!(matches!(record.replay(), Err(ReplayError::UnresolvedRound(0))));
    }

    #[test]
    fn test_commitment_ignores_timestamp() {
        let (initial, game) = played_game();
        let record = MatchRecord::from_game(Uuid::new_v4(), &initial, &game);
        let mut later = record.clone();
        later.recorded_at = record.recorded_at + chrono::Duration::seconds(30);

        assert_eq!(record.commitment(), later.commitment());

        later.match_id = Uuid::new_v4();
        assert_ne!(record.commitment(), later.commitment());
    }

    #[test]
    fn test_record_survives_json_and_binary() {
        let (initial, game) = played_game();
        let record = MatchRecord::from_game(Uuid::new_v4(), &initial, &game);

        let json = record.to_json().unwrap();
        assert!(json.contains("\"switchAttack\""));
        assert_eq!(MatchRecord::from_json(&json).unwrap(), record);

        let bytes = record.to_bytes().unwrap();
        assert_eq!(MatchRecord::from_bytes(&bytes).unwrap(), record);
        assert_eq!(MatchRecord::verify_bytes(&bytes).unwrap().state(), game.state());
    }

    #[test]
    fn test_unplayable_config_is_rejected() {
        let (initial, game) = played_game();
        let json = MatchRecord::from_game(Uuid::new_v4(), &initial, &game)
            .to_json()
            .unwrap()
            .replace("\"arena_size\": 6", "\"arena_size\": 0");

        assert!(matches!(
            MatchRecord::verify_json(&json),
            Err(ReplayError::InvalidConfig { arena_size: 0, .. })
        ));

        let mut record = MatchRecord::from_game(Uuid::new_v4(), &initial, &game);
        record.config.starting_health = 0;
        assert!(matches!(record.replay(), Err(ReplayError::InvalidConfig { starting_health: 0, .. })));
    }

    #[test]
    fn test_verify_json_reports_decode_errors() {
        assert!(matches!(MatchRecord::verify_json("{"), Err(ReplayError::Json(_))));
        assert!(matches!(MatchRecord::verify_bytes(&[1, 2, 3]), Err(ReplayError::Binary(_))));
    }
}
