//! Server configuration for the frame host.

use framestate_core::{StateError, StateResult, StateSecret};
use serde_json::{Map, Value};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Environment variable overriding the bind address.
pub const ENV_BIND_ADDR: &str = "FRAMESTATE_BIND_ADDR";
/// Environment variable holding the state signing secret.
pub const ENV_STATE_SECRET: &str = "FRAMESTATE_STATE_SECRET";
/// Environment variable holding the initial state as JSON.
pub const ENV_INITIAL_STATE: &str = "FRAMESTATE_INITIAL_STATE";
/// Environment variable overriding the max frame size in bytes.
pub const ENV_MAX_MESSAGE_SIZE: &str = "FRAMESTATE_MAX_MESSAGE_SIZE";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// State handed to handlers when a request carries none.
    pub initial_state: Value,
    /// Secret for signing outbound and verifying inbound state.
    pub state_signing_secret: Option<StateSecret>,
    /// Timeout for reading a frame body once its length is known.
    pub read_timeout: Duration,
    /// Max frame size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 9000)),
            initial_state: Value::Object(Map::new()),
            state_signing_secret: None,
            read_timeout: Duration::from_secs(30),
            max_message_size: 64 * 1024, // 64KB
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address.
    pub fn with_addr(addr: impl Into<SocketAddr>) -> Self {
        Self {
            bind_addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set the initial state.
    pub fn with_initial_state(mut self, initial_state: Value) -> Self {
        self.initial_state = initial_state;
        self
    }

    /// Enable state signing.
    pub fn with_state_signing_secret(mut self, secret: impl Into<StateSecret>) -> Self {
        self.state_signing_secret = Some(secret.into());
        self
    }

    /// Load defaults overlaid with `FRAMESTATE_*` environment variables.
    pub fn from_env() -> StateResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load defaults overlaid with values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StateResult<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            config.bind_addr = addr.parse().map_err(|e| {
                StateError::Validation(format!("Invalid {}: {}", ENV_BIND_ADDR, e))
            })?;
        }

        if let Some(secret) = lookup(ENV_STATE_SECRET).filter(|s| !s.is_empty()) {
            config.state_signing_secret = Some(StateSecret::from(secret));
        }

        if let Some(raw) = lookup(ENV_INITIAL_STATE) {
            config.initial_state = serde_json::from_str(&raw).map_err(|e| {
                StateError::Validation(format!("Invalid {}: {}", ENV_INITIAL_STATE, e))
            })?;
        }

        if let Some(size) = lookup(ENV_MAX_MESSAGE_SIZE) {
            config.max_message_size = size.parse().map_err(|e| {
                StateError::Validation(format!("Invalid {}: {}", ENV_MAX_MESSAGE_SIZE, e))
            })?;
        }

        Ok(config)
    }
}
