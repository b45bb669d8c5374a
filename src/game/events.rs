//! Round Events
//!
//! Events generated while a round resolves. The simulation never reads them
//! back; they exist for logs, replays and the presentation layer.

use serde::{Serialize, Deserialize};
use crate::game::moves::{Seat, Stance};

/// Phase a round event was produced in.
///
/// Lower value = earlier in the round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum RoundPhase {
    /// Stance changes
    Stance = 0,
    /// Movement resolution (after bounds clamping)
    Movement = 1,
    /// Range checks
    Attack = 2,
    /// Health loss
    Damage = 3,
}

/// Round event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEventData {
    /// A player's stance changed, either by choice or by a switch attack.
    StanceChanged {
        seat: Seat,
        stance: Stance,
    },

    /// A player's position was committed.
    Moved {
        seat: Seat,
        from: i32,
        to: i32,
    },

    /// Both intended positions were discarded because the players would
    /// have met or crossed.
    MovementBlocked {
        intended: [i32; 2],
    },

    /// An attack connected.
    AttackHit {
        attacker: Seat,
        range: i32,
    },

    /// An attack was thrown at the wrong distance.
    AttackMissed {
        attacker: Seat,
        range: i32,
        distance: i32,
    },

    /// A player lost health.
    Damaged {
        seat: Seat,
        health: u32,
    },

    /// A player's health reached zero.
    KnockedOut {
        seat: Seat,
    },
}

/// A round event with its ordering key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEvent {
    /// Round number (1-based) the event belongs to
    pub round: u32,

    /// Phase that produced the event
    pub phase: RoundPhase,

    /// Event data
    pub data: RoundEventData,
}

impl RoundEvent {
    /// Create a new event.
    pub fn new(round: u32, phase: RoundPhase, data: RoundEventData) -> Self {
        Self { round, phase, data }
    }

    /// Seat the event is about, if it concerns a single player.
    pub fn seat(&self) -> Option<Seat> {
        match &self.data {
            RoundEventData::StanceChanged { seat, .. }
            | RoundEventData::Moved { seat, .. }
            | RoundEventData::Damaged { seat, .. }
            | RoundEventData::KnockedOut { seat } => Some(*seat),
            RoundEventData::AttackHit { attacker, .. }
            | RoundEventData::AttackMissed { attacker, .. } => Some(*attacker),
            RoundEventData::MovementBlocked { .. } => None,
        }
    }

    /// Whether this event means movement was suppressed by the collision rule.
    pub fn is_blocked_movement(&self) -> bool {
        matches!(self.data, RoundEventData::MovementBlocked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ordering() {
        assert!(RoundPhase::Stance < RoundPhase::Movement);
        assert!(RoundPhase::Movement < RoundPhase::Attack);
        assert!(RoundPhase::Attack < RoundPhase::Damage);
    }

    #[test]
    fn test_event_seat() {
        let hit = RoundEvent::new(1, RoundPhase::Attack, RoundEventData::AttackHit {
            attacker: Seat::Second,
            range: 2,
        });
        assert_eq!(hit.seat(), Some(Seat::Second));

        let blocked = RoundEvent::new(1, RoundPhase::Movement, RoundEventData::MovementBlocked {
            intended: [4, 1],
        });
        assert_eq!(blocked.seat(), None);
        assert!(blocked.is_blocked_movement());
    }
}
