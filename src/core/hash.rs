//! State Hashing for Verification
//!
//! Provides deterministic hashing of arena state for:
//! - Desync detection between the server and its replicas
//! - Match record validation on replay

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for arena state.
///
/// Wraps SHA-256 with helpers for the primitive fields the simulation uses.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for arena state.
    pub fn for_arena_state() -> Self {
        Self::new(b"ARENA_DUEL_STATE_V1")
    }

    /// Create hasher for a match record.
    pub fn for_match_record() -> Self {
        Self::new(b"ARENA_DUEL_RECORD_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute state hash for replica verification.
///
/// The round number is always hashed first, so two arenas that happen to
/// hold the same positions at different points of a match never collide.
pub fn compute_state_hash<F>(round: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_arena_state();
    hasher.update_u32(round);
    add_state(&mut hasher);
    hasher.finalize()
}

/// Render a state hash for the wire and for logs.
pub fn to_hex(hash: &StateHash) -> String {
    hex::encode(hash)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_arena_state();
            hasher.update_u32(6);
            hasher.update_i32(-1);
            hasher.update_u8(1);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_i32(1);
            h.update_i32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_i32(2);
            h.update_i32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_domain_separation() {
        let data = [1u8, 2, 3, 4];

        let mut arena = StateHasher::for_arena_state();
        arena.update_bytes(&data);
        let mut record = StateHasher::for_match_record();
        record.update_bytes(&data);

        let hash1 = arena.finalize();
        let hash2 = record.finalize();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_compute_state_hash_includes_round() {
        let hash = compute_state_hash(3, |hasher| hasher.update_i32(1));
        let same = compute_state_hash(3, |hasher| hasher.update_i32(1));
        let later = compute_state_hash(4, |hasher| hasher.update_i32(1));

        assert_eq!(hash, same);
        assert_ne!(hash, later);
    }

    #[test]
    fn test_hex_rendering() {
        let hash = [0xabu8; 32];
        let rendered = to_hex(&hash);
        assert_eq!(rendered.len(), 64);
        assert!(rendered.starts_with("abab"));
    }
}
