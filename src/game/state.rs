//! Arena State Definitions
//!
//! The canonical mutable simulation: both players, the arena bounds and the
//! snapshot types used to undo a round. Round resolution itself lives in
//! `round.rs`.

use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::game::events::RoundEvent;
use crate::game::moves::{Seat, Stance};
use crate::{DEFAULT_ARENA_SIZE, STARTING_HEALTH};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Rules that are fixed for the lifetime of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Number of cells on the arena axis.
    pub arena_size: i32,
    /// Health each player starts with.
    pub starting_health: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            arena_size: DEFAULT_ARENA_SIZE,
            starting_health: STARTING_HEALTH,
        }
    }
}

impl ArenaConfig {
    /// Smallest arena that leaves room for the players to start apart.
    pub const MIN_ARENA_SIZE: i32 = 3;

    /// Config with a custom arena size and default health.
    pub fn with_arena_size(arena_size: i32) -> Self {
        Self {
            arena_size,
            ..Self::default()
        }
    }

    /// Whether a match can be played under these rules.
    pub fn is_playable(&self) -> bool {
        self.arena_size >= Self::MIN_ARENA_SIZE && self.starting_health > 0
    }

    /// Highest legal position.
    #[inline]
    pub fn max_position(&self) -> i32 {
        self.arena_size - 1
    }

    /// Spawn positions, symmetric around the integer midpoint.
    ///
    /// 6 cells → `[1, 3]`, 8 cells → `[2, 4]`.
    pub fn spawn_positions(&self) -> [i32; 2] {
        let center = (self.arena_size - 1) / 2;
        [center - 1, center + 1]
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// State of a single combatant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Cell on the arena axis, always within bounds between rounds
    pub position: i32,

    /// Intended position for the round being resolved
    #[serde(skip)]
    pub next_position: Option<i32>,

    /// Current posture
    pub stance: Stance,

    /// Remaining health
    pub health: u32,

    /// Set by the attack phase, consumed by the damage phase
    #[serde(skip)]
    pub is_hit: bool,
}

impl PlayerState {
    /// Create a player at a position in high stance.
    pub fn new(position: i32, health: u32) -> Self {
        Self {
            position,
            next_position: None,
            stance: Stance::High,
            health,
            is_hit: false,
        }
    }

    /// Serializable part of this player.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            health: self.health,
            position: self.position,
            stance: self.stance,
        }
    }

    /// Overwrite the serializable fields and drop any transient state.
    pub fn restore(&mut self, snapshot: &PlayerSnapshot) {
        self.health = snapshot.health;
        self.position = snapshot.position;
        self.stance = snapshot.stance;
        self.next_position = None;
        self.is_hit = false;
    }

    /// Whether the player can still fight.
    #[inline]
    pub fn is_standing(&self) -> bool {
        self.health > 0
    }

    /// Hash this player's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_i32(self.position);
        hasher.update_u8(self.stance as u8);
        hasher.update_u32(self.health);
    }
}

/// The `{health, position, stance}` triple of one player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Remaining health
    pub health: u32,
    /// Cell on the arena axis
    pub position: i32,
    /// Posture
    pub stance: Stance,
}

/// Before/after snapshots of both players around one round.
///
/// Enough to undo the round without knowing which moves produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Both players before the stance phase
    pub before: [PlayerSnapshot; 2],
    /// Both players after the damage phase
    pub after: [PlayerSnapshot; 2],
}

impl Delta {
    /// Whether the round changed anything observable.
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

// =============================================================================
// ARENA STATE
// =============================================================================

/// Complete state of the arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArenaState {
    /// Fixed rules for this match
    pub config: ArenaConfig,

    /// Both combatants, indexed by `Seat::index()`
    pub players: [PlayerState; 2],

    /// Number of rounds resolved so far (undo rewinds it)
    pub round: u32,

    /// Events generated by the last `apply` (drained by the caller)
    #[serde(skip)]
    pub pending_events: Vec<RoundEvent>,
}

impl ArenaState {
    /// Create an arena with both players at their spawn positions.
    pub fn new(config: ArenaConfig) -> Self {
        Self::with_positions(config, config.spawn_positions())
    }

    /// Create an arena with players at explicit positions.
    ///
    /// Positions are clamped into the arena.
    pub fn with_positions(config: ArenaConfig, positions: [i32; 2]) -> Self {
        let max = config.max_position().max(0);
        let players = positions.map(|p| PlayerState::new(p.clamp(0, max), config.starting_health));
        Self {
            config,
            players,
            round: 0,
            pending_events: Vec::new(),
        }
    }

    /// Arena size in cells.
    #[inline]
    pub fn arena_size(&self) -> i32 {
        self.config.arena_size
    }

    /// Get a player by seat.
    #[inline]
    pub fn player(&self, seat: Seat) -> &PlayerState {
        &self.players[seat.index()]
    }

    /// Get a player mutably by seat.
    #[inline]
    pub fn player_mut(&mut self, seat: Seat) -> &mut PlayerState {
        &mut self.players[seat.index()]
    }

    /// Cells between the two players.
    #[inline]
    pub fn distance(&self) -> i32 {
        (self.players[0].position - self.players[1].position).abs()
    }

    /// Serializable view of both players.
    pub fn snapshot(&self) -> [PlayerSnapshot; 2] {
        [self.players[0].snapshot(), self.players[1].snapshot()]
    }

    /// Check if a position is within the arena.
    #[inline]
    pub fn is_in_bounds(&self, position: i32) -> bool {
        (0..self.arena_size()).contains(&position)
    }

    /// Seats whose health has reached zero.
    pub fn knocked_out(&self) -> Vec<Seat> {
        Seat::ALL
            .into_iter()
            .filter(|seat| !self.player(*seat).is_standing())
            .collect()
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.round, |hasher| {
            hasher.update_i32(self.config.arena_size);
            for player in &self.players {
                player.hash_into(hasher);
            }
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a round event.
    pub fn push_event(&mut self, event: RoundEvent) {
        self.pending_events.push(event);
    }
}

impl PartialEq for ArenaState {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
            && self.round == other.round
            && self.snapshot() == other.snapshot()
    }
}

impl Eq for ArenaState {}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_positions_symmetric() {
        assert_eq!(ArenaConfig::with_arena_size(6).spawn_positions(), [1, 3]);
        assert_eq!(ArenaConfig::with_arena_size(8).spawn_positions(), [2, 4]);
        assert_eq!(ArenaConfig::with_arena_size(3).spawn_positions(), [0, 2]);
    }

    #[test]
    fn test_new_arena_defaults() {
        let state = ArenaState::new(ArenaConfig::default());
        assert_eq!(state.arena_size(), 6);
        assert_eq!(state.round, 0);
        for player in &state.players {
            assert_eq!(player.health, 2);
            assert_eq!(player.stance, Stance::High);
            assert_eq!(player.next_position, None);
            assert!(!player.is_hit);
        }
        assert_eq!(state.distance(), 2);
    }

    #[test]
    fn test_with_positions_clamps() {
        let state = ArenaState::with_positions(ArenaConfig::default(), [-3, 42]);
        assert_eq!(state.player(Seat::First).position, 0);
        assert_eq!(state.player(Seat::Second).position, 5);
    }

    #[test]
    fn test_degenerate_config_does_not_panic() {
        let config = ArenaConfig { arena_size: 0, starting_health: 2 };
        assert!(!config.is_playable());
        let state = ArenaState::with_positions(config, [1, 3]);
        assert_eq!(state.players[0].position, 0);
        assert_eq!(state.players[1].position, 0);
        assert!(ArenaConfig::default().is_playable());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut player = PlayerState::new(2, 2);
        let saved = player.snapshot();

        player.position = 4;
        player.health = 0;
        player.stance = Stance::Low;
        player.next_position = Some(5);
        player.is_hit = true;

        player.restore(&saved);
        assert_eq!(player, PlayerState::new(2, 2));
    }

    #[test]
    fn test_hash_determinism() {
        let state1 = ArenaState::new(ArenaConfig::default());
        let state2 = ArenaState::new(ArenaConfig::default());
        assert_eq!(state1.compute_hash(), state2.compute_hash());

        let mut moved = state1.clone();
        moved.player_mut(Seat::First).position += 1;
        assert_ne!(state1.compute_hash(), moved.compute_hash());
    }

    #[test]
    fn test_knocked_out() {
        let mut state = ArenaState::new(ArenaConfig::default());
        assert!(state.knocked_out().is_empty());
        state.player_mut(Seat::Second).health = 0;
        assert_eq!(state.knocked_out(), vec![Seat::Second]);
    }
}
