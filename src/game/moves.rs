//! Command and Move Vocabulary
//!
//! The closed set of player intents and the resolution rules each implies.
//! Offsets are expressed in cells *toward the opponent*; the sign on the
//! arena axis comes from the seat, never from the move.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

// =============================================================================
// SEAT
// =============================================================================

/// One of the two combatant slots.
///
/// Serialized as the bare index (`0` or `1`) so envelopes stay compact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Seat {
    /// Player 0, starts on the low side of the arena.
    First,
    /// Player 1, starts on the high side of the arena.
    Second,
}

impl Seat {
    /// Both seats in index order.
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    /// Array index of this seat.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    /// Seat for an index (0 or 1).
    pub fn from_index(index: usize) -> Option<Seat> {
        match index {
            0 => Some(Seat::First),
            1 => Some(Seat::Second),
            _ => None,
        }
    }

    /// The other combatant.
    #[inline]
    pub const fn opponent(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    /// Direction of travel toward the opponent on the arena axis.
    #[inline]
    pub const fn facing(self) -> i32 {
        match self {
            Seat::First => 1,
            Seat::Second => -1,
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> u8 {
        seat.index() as u8
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Seat::from_index(value as usize).ok_or_else(|| format!("invalid seat index {value}"))
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.index())
    }
}

// =============================================================================
// STANCE
// =============================================================================

/// Binary combat posture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum Stance {
    /// Default posture; extends the reach of a switch attack.
    #[default]
    High = 0,
    /// Crouched posture.
    Low = 1,
}

impl Stance {
    /// The opposite posture.
    #[inline]
    pub const fn toggled(self) -> Stance {
        match self {
            Stance::High => Stance::Low,
            Stance::Low => Stance::High,
        }
    }
}

// =============================================================================
// MOVES
// =============================================================================

/// What a move does during round resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveCategory {
    /// Sets an intended position.
    Movement,
    /// Tests range against the opponent after movement resolves.
    Attack,
    /// Changes posture before anything else happens.
    Stance,
}

/// A player intent for one round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Move {
    /// Step one cell toward the opponent. Also the idle default.
    #[default]
    Advance,
    /// Rush two cells toward the opponent.
    Charge,
    /// Step one cell away from the opponent.
    Retreat,
    /// Fixed-range strike.
    NeutralAttack,
    /// Stance-linked strike that flips the attacker's stance.
    SwitchAttack,
    /// Toggle between high and low stance.
    ChangeStance,
}

impl Move {
    /// Every move, in menu order.
    pub const ALL: [Move; 6] = [
        Move::Advance,
        Move::Charge,
        Move::Retreat,
        Move::NeutralAttack,
        Move::SwitchAttack,
        Move::ChangeStance,
    ];

    /// Reach of a neutral attack.
    pub const NEUTRAL_RANGE: i32 = 1;

    /// Reach of a switch attack from high stance.
    pub const SWITCH_RANGE_HIGH: i32 = 2;

    /// Reach of a switch attack from low stance.
    pub const SWITCH_RANGE_LOW: i32 = 1;

    /// Resolution category.
    pub const fn category(self) -> MoveCategory {
        match self {
            Move::Advance | Move::Charge | Move::Retreat => MoveCategory::Movement,
            Move::NeutralAttack | Move::SwitchAttack => MoveCategory::Attack,
            Move::ChangeStance => MoveCategory::Stance,
        }
    }

    /// Cells travelled toward the opponent (negative = away).
    ///
    /// `None` for moves that leave the intended position untouched.
    pub const fn offset(self) -> Option<i32> {
        match self {
            Move::Advance => Some(1),
            Move::Charge => Some(2),
            Move::Retreat => Some(-1),
            Move::NeutralAttack | Move::SwitchAttack | Move::ChangeStance => None,
        }
    }

    /// Exact distance at which this attack connects, given the attacker's stance.
    pub const fn attack_range(self, stance: Stance) -> Option<i32> {
        match self {
            Move::NeutralAttack => Some(Self::NEUTRAL_RANGE),
            Move::SwitchAttack => match stance {
                Stance::High => Some(Self::SWITCH_RANGE_HIGH),
                Stance::Low => Some(Self::SWITCH_RANGE_LOW),
            },
            _ => None,
        }
    }

    /// Whether executing this attack flips the attacker's stance.
    pub const fn flips_stance_on_attack(self) -> bool {
        matches!(self, Move::SwitchAttack)
    }

    /// Short lowercase name, as typed on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Move::Advance => "advance",
            Move::Charge => "charge",
            Move::Retreat => "retreat",
            Move::NeutralAttack => "attack",
            Move::SwitchAttack => "switch",
            Move::ChangeStance => "stance",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing a move name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown move: {0}")]
pub struct UnknownMove(pub String);

impl FromStr for Move {
    type Err = UnknownMove;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advance" | "a" => Ok(Move::Advance),
            "charge" | "c" => Ok(Move::Charge),
            "retreat" | "r" => Ok(Move::Retreat),
            "attack" | "neutral" | "neutralattack" | "n" => Ok(Move::NeutralAttack),
            "switch" | "switchattack" | "w" => Ok(Move::SwitchAttack),
            "stance" | "changestance" | "s" => Ok(Move::ChangeStance),
            other => Err(UnknownMove(other.to_string())),
        }
    }
}

// =============================================================================
// COMMAND
// =============================================================================

/// A move declared by a specific seat. Immutable once submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    /// Who issued the move.
    pub seat: Seat,
    /// What they intend to do.
    #[serde(rename = "move")]
    pub mv: Move,
}

impl Command {
    /// Create a command.
    pub const fn new(seat: Seat, mv: Move) -> Self {
        Self { seat, mv }
    }

    /// Signed displacement on the arena axis, if this command moves.
    #[inline]
    pub fn displacement(&self) -> Option<i32> {
        self.mv.offset().map(|cells| cells * self.seat.facing())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seat, self.mv)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_symmetry() {
        assert_eq!(Seat::First.opponent(), Seat::Second);
        assert_eq!(Seat::Second.opponent(), Seat::First);
        assert_eq!(Seat::First.facing(), -Seat::Second.facing());
        assert_eq!(Seat::from_index(1), Some(Seat::Second));
        assert_eq!(Seat::from_index(2), None);
    }

    #[test]
    fn test_displacement_follows_seat() {
        let forward = Command::new(Seat::First, Move::Charge);
        let mirrored = Command::new(Seat::Second, Move::Charge);
        assert_eq!(forward.displacement(), Some(2));
        assert_eq!(mirrored.displacement(), Some(-2));

        assert_eq!(Command::new(Seat::First, Move::Retreat).displacement(), Some(-1));
        assert_eq!(Command::new(Seat::Second, Move::Retreat).displacement(), Some(1));
        assert_eq!(Command::new(Seat::Second, Move::NeutralAttack).displacement(), None);
    }

    #[test]
    fn test_attack_ranges() {
        assert_eq!(Move::NeutralAttack.attack_range(Stance::High), Some(1));
        assert_eq!(Move::NeutralAttack.attack_range(Stance::Low), Some(1));
        assert_eq!(Move::SwitchAttack.attack_range(Stance::High), Some(2));
        assert_eq!(Move::SwitchAttack.attack_range(Stance::Low), Some(1));
        assert_eq!(Move::Charge.attack_range(Stance::High), None);
    }

    #[test]
    fn test_categories() {
        for mv in Move::ALL {
            let has_offset = mv.offset().is_some();
            assert_eq!(has_offset, mv.category() == MoveCategory::Movement, "{mv}");
        }
        assert_eq!(Move::ChangeStance.category(), MoveCategory::Stance);
    }

    #[test]
    fn test_move_names_parse_back() {
        for mv in Move::ALL {
            assert_eq!(mv.name().parse::<Move>(), Ok(mv));
        }
        assert!(" Charge ".parse::<Move>().is_ok());
        assert_eq!("jump".parse::<Move>(), Err(UnknownMove("jump".to_string())));
    }

    #[test]
    fn test_command_json_shape() {
        let cmd = Command::new(Seat::Second, Move::SwitchAttack);
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"seat":1,"move":"switchAttack"}"#);

        let bad = serde_json::from_str::<Command>(r#"{"seat":2,"move":"advance"}"#);
        assert!(bad.is_err());
    }
}
