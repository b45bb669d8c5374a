//! Core deterministic primitives.
//!
//! Everything here is platform independent: the same inputs hash to the
//! same bytes on every machine.

pub mod hash;

// Re-export core types
pub use hash::{compute_state_hash, StateHash, StateHasher};
