//! # Arena Duel
//!
//! Deterministic, authoritative engine for a two-player arena duel: both
//! players pick a move each round, the round resolves in a fixed sequence
//! of phases, and every replica re-simulates the same commands to stay in
//! sync with the single authority.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ARENA DUEL                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── moves.rs    - Seats, stances, moves, commands           │
//! │  ├── state.rs    - Arena and player state, deltas            │
//! │  ├── round.rs    - Six-phase round resolution and undo       │
//! │  ├── events.rs   - Round events                              │
//! │  ├── turn.rs     - Turn coordinator and history              │
//! │  └── record.rs   - Match records and replay                  │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── protocol.rs - Envelope and event types                  │
//! │  ├── server.rs   - Authoritative server                      │
//! │  ├── client.rs   - Client replica                            │
//! │  ├── router.rs   - Process context and routing               │
//! │  ├── transport.rs- Transport trait, channel transport        │
//! │  └── socket.rs   - WebSocket peer link                       │
//! │                                                              │
//! │  config.rs       - Runtime configuration                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - Integer arithmetic only
//! - Fixed iteration order (seat 0 before seat 1)
//! - No system time or randomness
//!
//! Given the same initial arena and the same command sequence, the
//! simulation produces **identical state hashes** on every replica.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod config;

// Re-export commonly used types
pub use game::moves::{Command, Move, Seat, Stance};
pub use game::state::{ArenaConfig, ArenaState, PlayerState};
pub use game::turn::{Game, MatchOutcome};
pub use network::{Client, Context, Envelope, Server};
pub use config::DuelConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cells on the arena axis unless configured otherwise
pub const DEFAULT_ARENA_SIZE: i32 = 6;

/// Health each player starts a match with
pub const STARTING_HEALTH: u32 = 2;
