//! Runtime Configuration
//!
//! Defaults, overridden by environment variables, overridden again by
//! command-line flags in the binary.
//!
//! | Variable | Field |
//! |---|---|
//! | `DUEL_ARENA_SIZE` | `arena.arena_size` |
//! | `DUEL_STARTING_HEALTH` | `arena.starting_health` |
//! | `DUEL_VERIFY_HASH` | `verify_hash` |
//! | `DUEL_BIND_ADDR` | `network.bind_addr` |
//! | `DUEL_PEER_URL` | `network.peer_url` |
//! | `DUEL_CHANNEL_CAPACITY` | `network.channel_capacity` |

use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::state::ArenaConfig;
use crate::network::transport::DEFAULT_CHANNEL_CAPACITY;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Arena too small to place both players apart.
    #[error("Arena size {0} is below the minimum of {min}", min = ArenaConfig::MIN_ARENA_SIZE)]
    ArenaTooSmall(i32),

    /// Players would start knocked out.
    #[error("Starting health must be at least 1")]
    ZeroHealth,

    /// Channels need room for at least one frame.
    #[error("Channel capacity must be at least 1")]
    ZeroCapacity,

    /// An environment variable could not be parsed.
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Network settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Address the hosting peer listens on.
    pub bind_addr: SocketAddr,
    /// Where the joining peer connects.
    pub peer_url: String,
    /// Frames buffered per direction.
    pub channel_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            peer_url: "ws://127.0.0.1:8080".to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Everything a process needs to take part in a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelConfig {
    /// Match rules.
    pub arena: ArenaConfig,
    /// Send and check state hashes with every round.
    pub verify_hash: bool,
    /// Transport settings.
    pub network: NetworkConfig,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            verify_hash: true,
            network: NetworkConfig::default(),
        }
    }
}

impl DuelConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`DuelConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(size) = parse_var(&lookup, "DUEL_ARENA_SIZE")? {
            config.arena.arena_size = size;
        }
        if let Some(health) = parse_var(&lookup, "DUEL_STARTING_HEALTH")? {
            config.arena.starting_health = health;
        }
        if let Some(value) = lookup("DUEL_VERIFY_HASH") {
            config.verify_hash = value == "true" || value == "1";
        }
        if let Some(addr) = parse_var(&lookup, "DUEL_BIND_ADDR")? {
            config.network.bind_addr = addr;
        }
        if let Some(url) = lookup("DUEL_PEER_URL") {
            config.network.peer_url = url;
        }
        if let Some(capacity) = parse_var(&lookup, "DUEL_CHANNEL_CAPACITY")? {
            config.network.channel_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the config describes a playable match.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena.arena_size < ArenaConfig::MIN_ARENA_SIZE {
            return Err(ConfigError::ArenaTooSmall(self.arena.arena_size));
        }
        if self.arena.starting_health == 0 {
            return Err(ConfigError::ZeroHealth);
        }
        if self.network.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
    }
}
