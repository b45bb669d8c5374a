//! Protocol Messages
//!
//! Wire format shared by every process in a match. Each frame is one JSON
//! envelope naming the side it is addressed to and carrying exactly one
//! event:
//!
//! ```json
//! {"target":"server","event":{"type":"selectMove","move":{"seat":0,"move":"charge"},"round":3}}
//! {"target":"client","event":{"type":"applyMoves","move":[{"seat":0,"move":"charge"},{"seat":1,"move":"retreat"}],"round":3}}
//! ```
//!
//! Every event may carry the round it concerns. Receivers drop events whose
//! round does not match their own game, which makes redelivered frames
//! harmless. Events without a round are always applied.
//!
//! Internally tagged events are not supported by bincode, so envelopes
//! are JSON only.

use std::slice;

use serde::{Serialize, Deserialize};

use crate::game::moves::Command;

// =============================================================================
// ERRORS
// =============================================================================

/// Envelope encoding errors. Both are fatal for the frame they concern.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Malformed JSON, unknown target or unknown event type.
    #[error("Failed to decode envelope: {0}")]
    Decode(#[source] serde_json::Error),

    /// Serialization failed.
    #[error("Failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

// =============================================================================
// CLIENT -> SERVER EVENTS
// =============================================================================

/// The commands carried by a `selectMove`.
///
/// A single-seat client sends one command; a hot-seat client may send both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Submission {
    /// One seat's intent.
    One(Command),
    /// Both seats' intents.
    Both([Command; 2]),
}

impl Submission {
    /// Build a submission from staged commands.
    ///
    /// Returns `None` for anything other than one or two commands.
    pub fn from_commands(commands: &[Command]) -> Option<Self> {
        match *commands {
            [one] => Some(Submission::One(one)),
            [first, second] => Some(Submission::Both([first, second])),
            _ => None,
        }
    }

    /// The commands in submission order.
    pub fn commands(&self) -> &[Command] {
        match self {
            Submission::One(cmd) => slice::from_ref(cmd),
            Submission::Both(cmds) => cmds,
        }
    }
}

/// Events addressed to the process hosting the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Stage one or both intents for the upcoming round.
    SelectMove {
        #[serde(rename = "move")]
        submission: Submission,
        /// Round the intents are meant for (resolved rounds + 1).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<u32>,
    },

    /// Rewind the most recent round.
    UndoMove {
        /// Round to rewind (resolved rounds).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<u32>,
    },
}

impl ServerEvent {
    /// `selectMove` for a set of commands aimed at a given round.
    pub fn select(submission: Submission, round: u32) -> Self {
        ServerEvent::SelectMove {
            submission,
            round: Some(round),
        }
    }

    /// `undoMove` for the given resolved round.
    pub fn undo(round: u32) -> Self {
        ServerEvent::UndoMove { round: Some(round) }
    }

    /// Event name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::SelectMove { .. } => "selectMove",
            ServerEvent::UndoMove { .. } => "undoMove",
        }
    }
}

// =============================================================================
// SERVER -> CLIENT EVENTS
// =============================================================================

/// Broadcasts from the authority to every replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// A round resolved with these commands, in seat order.
    ApplyMoves {
        #[serde(rename = "move")]
        moves: [Command; 2],
        /// Round these commands resolved.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<u32>,
        /// Hex state hash of the authority after the round.
        #[serde(default, rename = "stateHash", skip_serializing_if = "Option::is_none")]
        state_hash: Option<String>,
    },

    /// The most recent round was rewound.
    UndoMoves {
        /// Round that was rewound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<u32>,
    },
}

impl ClientEvent {
    /// Event name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::ApplyMoves { .. } => "applyMoves",
            ClientEvent::UndoMoves { .. } => "undoMoves",
        }
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Which side of the match a frame is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The process hosting the authority.
    Server,
    /// Every replica.
    Client,
}

/// A routed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "event", rename_all = "lowercase")]
pub enum Envelope {
    /// Addressed to the authority.
    Server(ServerEvent),
    /// Addressed to every replica.
    Client(ClientEvent),
}

impl Envelope {
    /// Routing target.
    pub fn target(&self) -> Target {
        match self {
            Envelope::Server(_) => Target::Server,
            Envelope::Client(_) => Target::Client,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(s).map_err(ProtocolError::Decode)
    }
}

impl From<ServerEvent> for Envelope {
    fn from(event: ServerEvent) -> Self {
        Envelope::Server(event)
    }
}

impl From<ClientEvent> for Envelope {
    fn from(event: ClientEvent) -> Self {
        Envelope::Client(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::moves::{Move, Seat};

    #[test]
    fn test_select_move_single_command_json() {
        let event = ServerEvent::select(
            Submission::One(Command::new(Seat::First, Move::Charge)),
            3,
        );
        let json = Envelope::from(event.clone()).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"target":"server","event":{"type":"selectMove","move":{"seat":0,"move":"charge"},"round":3}}"#
        );
        assert_eq!(Envelope::from_json(&json).unwrap(), Envelope::Server(event));
    }

    #[test]
    fn test_select_move_both_commands_without_round() {
        let json = r#"{"target":"server","event":{"type":"selectMove","move":[
            {"seat":0,"move":"advance"},{"seat":1,"move":"neutralAttack"}]}}"#;

        match Envelope::from_json(json).unwrap() {
            Envelope::Server(ServerEvent::SelectMove { submission, round }) => {
                assert_eq!(round, None);
                assert_eq!(submission.commands(), &[
                    Command::new(Seat::First, Move::Advance),
                    Command::new(Seat::Second, Move::NeutralAttack),
                ]);
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_apply_moves_json() {
        let event = ClientEvent::ApplyMoves {
            moves: [
                Command::new(Seat::First, Move::SwitchAttack),
                Command::new(Seat::Second, Move::ChangeStance),
            ],
            round: Some(4),
            state_hash: Some("ab".repeat(32)),
        };
        let json = Envelope::from(event.clone()).to_json().unwrap();
        assert!(json.starts_with(r#"{"target":"client","event":{"type":"applyMoves","move":[{"seat":0"#));
        assert!(json.contains(r#""round":4"#));
        assert!(json.contains(r#""stateHash":"abab"#));
        assert_eq!(Envelope::from_json(&json).unwrap(), Envelope::Client(event));
    }

    #[test]
    fn test_unit_events_json() {
        let undo = Envelope::Server(ServerEvent::UndoMove { round: None }).to_json().unwrap();
        assert_eq!(undo, r#"{"target":"server","event":{"type":"undoMove"}}"#);

        let undone = Envelope::from_json(r#"{"target":"client","event":{"type":"undoMoves"}}"#).unwrap();
        assert_eq!(undone, Envelope::Client(ClientEvent::UndoMoves { round: None }));
    }

    #[test]
    fn test_undo_events_carry_round() {
        let undo = Envelope::from(ServerEvent::undo(2)).to_json().unwrap();
        assert_eq!(undo, r#"{"target":"server","event":{"type":"undoMove","round":2}}"#);

        let undone = Envelope::from_json(r#"{"target":"client","event":{"type":"undoMoves","round":2}}"#).unwrap();
        assert_eq!(undone, Envelope::Client(ClientEvent::UndoMoves { round: Some(2) }));
    }

    #[test]
    fn test_unknown_vocabulary_rejected() {
        let cases = [
            r#"{"target":"server","event":{"type":"teleport"}}"#,
            r#"{"target":"lobby","event":{"type":"undoMove"}}"#,
            r#"{"target":"server","event":{"type":"selectMove","move":{"seat":0,"move":"jump"}}}"#,
            r#"{"target":"server","event":{"type":"selectMove","move":{"seat":5,"move":"advance"}}}"#,
            "not json",
        ];
        for case in cases {
            assert!(matches!(Envelope::from_json(case), Err(ProtocolError::Decode(_))), "{case}");
        }
    }

    #[test]
    fn test_submission_from_commands() {
        let cmd = Command::new(Seat::Second, Move::Retreat);
        assert_eq!(Submission::from_commands(&[cmd]), Some(Submission::One(cmd)));
        assert_eq!(Submission::from_commands(&[]), None);
        assert_eq!(Submission::from_commands(&[cmd, cmd, cmd]), None);
    }

    #[test]
    fn test_envelope_target() {
        assert_eq!(Envelope::Server(ServerEvent::undo(1)).target(), Target::Server);
        assert_eq!(Envelope::Client(ClientEvent::UndoMoves { round: None }).target(), Target::Client);
    }
}
