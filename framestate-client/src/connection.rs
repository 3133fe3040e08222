//! TCP connection for the frame client.

use std::net::{Ipv4Addr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use framestate_core::{FrameRequest, FrameResponse, StateError, StateResult};

/// Client connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub server_addr: SocketAddr,
    /// Max response size.
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 9000)),
            max_message_size: 64 * 1024,
        }
    }
}

impl ConnectionConfig {
    /// Create config for a server address.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            server_addr: addr,
            ..Default::default()
        }
    }
}

/// Connection to a frame server.
pub struct Connection {
    stream: TcpStream,
    max_message_size: usize,
}

impl Connection {
    /// Connect to server.
    pub async fn connect(config: &ConnectionConfig) -> StateResult<Self> {
        let stream = TcpStream::connect(&config.server_addr)
            .await
            .map_err(|e| StateError::Transport(format!("Connection failed: {}", e)))?;

        tracing::debug!("Connected to {}", config.server_addr);

        Ok(Self {
            stream,
            max_message_size: config.max_message_size,
        })
    }

    /// Send a request and receive the response.
    pub async fn send_request(&mut self, request: &FrameRequest) -> StateResult<FrameResponse> {
        let json = serde_json::to_vec(request)?;
        let len = json.len() as u32;

        // Send length prefix + message
        self.stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| StateError::Transport(format!("Write error: {}", e)))?;
        self.stream
            .write_all(&json)
            .await
            .map_err(|e| StateError::Transport(format!("Write error: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| StateError::Transport(format!("Flush error: {}", e)))?;

        // Read response length
        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| StateError::Transport(format!("Read error: {}", e)))?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len > self.max_message_size {
            return Err(StateError::Validation(format!(
                "Response too large: {} > {}",
                len, self.max_message_size
            )));
        }

        // Read response body
        let mut msg_buf = vec![0u8; len];
        self.stream
            .read_exact(&mut msg_buf)
            .await
            .map_err(|e| StateError::Transport(format!("Read error: {}", e)))?;

        let response: FrameResponse = serde_json::from_slice(&msg_buf)?;
        Ok(response)
    }
}
