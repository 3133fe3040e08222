//! framestate server - hosts frames behind the state middleware.

mod config;
mod frames;
mod handler;

pub use config::ServerConfig;
pub use handler::Server;

use framestate_core::{StateError, StateResult};

#[tokio::main]
async fn main() -> StateResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let mut config = ServerConfig::from_env()?;

    // Command line bind address wins over the environment
    if let Some(addr) = std::env::args().nth(1) {
        config.bind_addr = addr
            .parse()
            .map_err(|e| StateError::Validation(format!("Invalid bind address: {}", e)))?;
    }

    if config.state_signing_secret.is_none() {
        tracing::warn!(
            "{} is not set, state will be sent unsigned",
            config::ENV_STATE_SECRET
        );
    }

    tracing::info!("Starting framestate server on {}", config.bind_addr);
    tracing::info!("Initial state: {}", config.initial_state);

    let server = Server::new(config, frames::counter);
    server.run().await
}
