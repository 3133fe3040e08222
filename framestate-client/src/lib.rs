//! framestate client - carries frame state between requests.
//!
//! The server keeps no state of its own: every response carries the state
//! text, and the client sends it back with the next request.
//!
//! # Example
//!
//! ```no_run
//! use framestate_client::FrameClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = FrameClient::connect("127.0.0.1:9000").await?;
//!
//!     client.start().await?;
//!     let result = client.interact().await?;
//!     println!("Image: {:?}", result.get("image"));
//!     println!("State: {:?}", client.decoded_state()?);
//!
//!     Ok(())
//! }
//! ```

mod connection;

pub use connection::{Connection, ConnectionConfig};

use std::net::SocketAddr;

use serde_json::Value;

use framestate_core::{
    Envelope, ErrorCode, FrameMessage, FrameRequest, FrameResponse,
    InvalidStateSignatureError, StateError, StateResult, StatefulResult,
};

/// High-level frame client.
pub struct FrameClient {
    connection: Connection,
    state: Option<String>,
    last_result: Option<StatefulResult>,
}

impl FrameClient {
    /// Connect to a frame server.
    pub async fn connect(addr: impl AsRef<str>) -> StateResult<Self> {
        let addr: SocketAddr = addr
            .as_ref()
            .parse()
            .map_err(|e| StateError::Transport(format!("Invalid address: {}", e)))?;

        Self::connect_with(&ConnectionConfig::new(addr)).await
    }

    /// Connect with explicit connection settings.
    pub async fn connect_with(config: &ConnectionConfig) -> StateResult<Self> {
        let connection = Connection::connect(config).await?;

        Ok(Self {
            connection,
            state: None,
            last_result: None,
        })
    }

    /// Enter the frame with an initial request, dropping any carried state.
    pub async fn start(&mut self) -> StateResult<StatefulResult> {
        self.reset();
        let response = self.connection.send_request(&FrameRequest::initial()).await?;
        self.apply(response)
    }

    /// Continue the frame, sending back the state from the last response.
    pub async fn interact(&mut self) -> StateResult<StatefulResult> {
        let message = FrameMessage {
            state: self.state.clone().map(Value::String),
        };
        let response = self
            .connection
            .send_request(&FrameRequest::continuation(message))
            .await?;
        self.apply(response)
    }

    /// State text returned by the last response.
    pub fn state_text(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Carried state with any signature stripped. The signature is not checked;
    /// only the server holds the secret.
    pub fn decoded_state(&self) -> StateResult<Option<Value>> {
        self.state
            .as_deref()
            .map(|text| {
                Envelope::parse(text)
                    .map(Envelope::into_data)
                    .map_err(StateError::from)
            })
            .transpose()
    }

    /// Carry previously saved state text into the next [`interact`](Self::interact).
    pub fn resume(&mut self, state_text: impl Into<String>) {
        self.state = Some(state_text.into());
    }

    /// Last successful result.
    pub fn last_result(&self) -> Option<&StatefulResult> {
        self.last_result.as_ref()
    }

    /// Forget carried state.
    pub fn reset(&mut self) {
        self.state = None;
        self.last_result = None;
    }

    fn apply(&mut self, response: FrameResponse) -> StateResult<StatefulResult> {
        let result = into_result(response)?;
        tracing::debug!("Carrying {} bytes of state", result.state.len());
        self.state = Some(result.state.clone());
        self.last_result = Some(result.clone());
        Ok(result)
    }
}

/// Turn a response frame into a result, mapping server errors back to
/// [`StateError`].
pub fn into_result(response: FrameResponse) -> StateResult<StatefulResult> {
    match response {
        FrameResponse::Ok { result } => Ok(result),
        FrameResponse::Error { code, message } => match code {
            ErrorCode::InvalidStateSignature => Err(InvalidStateSignatureError.into()),
            ErrorCode::HandlerFailed => Err(StateError::Handler(message)),
            other => Err(StateError::Protocol(format!("{}: {}", other, message))),
        },
    }
}
