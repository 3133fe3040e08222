//! TCP frame host: runs the state middleware in front of a frame handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use framestate_core::{
    FrameContext, FrameRequest, FrameResponse, FrameResult, StateError, StateMiddleware,
    StateResult,
};

use crate::config::ServerConfig;

/// Boxed future returned by a frame handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = StateResult<FrameResult>> + Send>>;

/// Frame handler: receives the context with recovered state.
pub type FrameHandler = Arc<dyn Fn(FrameContext) -> HandlerFuture + Send + Sync>;

/// Frame server.
pub struct Server {
    config: ServerConfig,
    middleware: Arc<StateMiddleware>,
    handler: FrameHandler,
}

impl Server {
    /// Create a new server around `handler`.
    pub fn new<F, Fut>(config: ServerConfig, handler: F) -> Self
    where
        F: Fn(FrameContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StateResult<FrameResult>> + Send + 'static,
    {
        let handler: FrameHandler =
            Arc::new(move |ctx| Box::pin(handler(ctx)) as HandlerFuture);
        Self {
            config,
            middleware: Arc::new(StateMiddleware::new()),
            handler,
        }
    }

    /// Bind the configured address and run the server.
    pub async fn run(self) -> StateResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|e| StateError::Transport(format!("Failed to bind: {}", e)))?;

        tracing::info!("framestate server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> StateResult<()> {
        loop {
            let (stream, addr) = listener
                .accept()
                .await
                .map_err(|e| StateError::Transport(format!("Accept failed: {}", e)))?;

            tracing::debug!("Connection from {}", addr);

            let config = self.config.clone();
            let middleware = Arc::clone(&self.middleware);
            let handler = Arc::clone(&self.handler);

            tokio::spawn(async move {
                if let Err(e) = Self::handle_stream(stream, config, middleware, handler).await {
                    tracing::error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }

    /// Handle the frame stream of one connection.
    async fn handle_stream(
        mut stream: TcpStream,
        config: ServerConfig,
        middleware: Arc<StateMiddleware>,
        handler: FrameHandler,
    ) -> StateResult<()> {
        loop {
            let Some(body) = read_frame(&mut stream, &config).await? else {
                tracing::debug!("Client disconnected");
                break;
            };

            let response = match serde_json::from_slice::<FrameRequest>(&body) {
                Ok(request) => process_request(&middleware, &config, &handler, request).await,
                Err(e) => {
                    tracing::warn!("Malformed frame request: {}", e);
                    FrameResponse::error(&StateError::Serialization(e))
                }
            };

            send_response(&mut stream, &response).await?;
        }

        Ok(())
    }
}

/// Run one request through the middleware and handler.
pub async fn process_request(
    middleware: &StateMiddleware,
    config: &ServerConfig,
    handler: &FrameHandler,
    request: FrameRequest,
) -> FrameResponse {
    tracing::debug!("{:?} frame request", request.method);

    let mut ctx = FrameContext::new(request).with_initial_state(config.initial_state.clone());
    ctx.state_signing_secret = config.state_signing_secret.clone();

    match middleware.handle(ctx, |ctx| handler(ctx)).await {
        Ok(result) => FrameResponse::Ok { result },
        Err(e) => {
            if e.is_invalid_signature() {
                tracing::warn!("Rejected frame with invalid state signature");
            } else {
                tracing::error!("Processing error: {}", e);
            }
            FrameResponse::error(&e)
        }
    }
}

/// Read one length-prefixed frame. `None` on clean disconnect.
async fn read_frame<S>(stream: &mut S, config: &ServerConfig) -> StateResult<Option<Vec<u8>>>
where
    S: AsyncReadExt + Unpin,
{
    // Read length prefix (4 bytes, big-endian); an idle client is dropped
    let mut len_buf = [0u8; 4];
    match tokio::time::timeout(config.read_timeout, stream.read_exact(&mut len_buf)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Ok(Err(e)) => return Err(StateError::Transport(format!("Read error: {}", e))),
        Err(_) => {
            tracing::debug!("Client idle for {:?}", config.read_timeout);
            return Ok(None);
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > config.max_message_size {
        return Err(StateError::Validation(format!(
            "Message too large: {} > {}",
            len, config.max_message_size
        )));
    }

    let mut body = vec![0u8; len];
    tokio::time::timeout(config.read_timeout, stream.read_exact(&mut body))
        .await
        .map_err(|_| StateError::Transport("Read timed out".to_string()))?
        .map_err(|e| StateError::Transport(format!("Read error: {}", e)))?;

    Ok(Some(body))
}

/// Send a response frame.
async fn send_response<S>(stream: &mut S, response: &FrameResponse) -> StateResult<()>
where
    S: AsyncWriteExt + Unpin,
{
    let json = serde_json::to_vec(response)?;
    let len = json.len() as u32;

    stream
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| StateError::Transport(format!("Write error: {}", e)))?;
    stream
        .write_all(&json)
        .await
        .map_err(|e| StateError::Transport(format!("Write error: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| StateError::Transport(format!("Flush error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::counter;
    use framestate_core::{sign_hex, ErrorCode, FrameMessage};
    use serde_json::json;
    use std::net::SocketAddr;

    async fn spawn_server(config: ServerConfig) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::new(config, counter);
        tokio::spawn(server.serve(listener));
        addr
    }

    async fn roundtrip(stream: &mut TcpStream, request: &FrameRequest) -> FrameResponse {
        let body = serde_json::to_vec(request).unwrap();
        stream.write_all(&(body.len() as u32).to_be_bytes()).await.unwrap();
        stream.write_all(&body).await.unwrap();

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut buf = vec![0u8; u32::from_be_bytes(len_buf) as usize];
        stream.read_exact(&mut buf).await.unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    fn state_of(response: FrameResponse) -> String {
        match response {
            FrameResponse::Ok { result } => result.state,
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn signed_counter_roundtrip() {
        let config = ServerConfig::default()
            .with_initial_state(json!({"count": 0}))
            .with_state_signing_secret("test");
        let addr = spawn_server(config).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let first = state_of(roundtrip(&mut stream, &FrameRequest::initial()).await);
        let sig = sign_hex(br#"{"count":0}"#, b"test");
        assert_eq!(first, format!(r#"{{"data":{{"count":0}},"__sig":"{}"}}"#, sig));

        let next = FrameRequest::continuation(FrameMessage::with_state(first));
        let second = state_of(roundtrip(&mut stream, &next).await);
        let sig = sign_hex(br#"{"count":1}"#, b"test");
        assert_eq!(second, format!(r#"{{"data":{{"count":1}},"__sig":"{}"}}"#, sig));
    }

    #[tokio::test]
    async fn tampered_state_is_rejected_and_connection_survives() {
        let config = ServerConfig::default()
            .with_initial_state(json!({"count": 0}))
            .with_state_signing_secret("test");
        let addr = spawn_server(config).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let sig = sign_hex(br#"{"count":1}"#, b"test");
        let forged = format!(r#"{{"data":{{"count":1000}},"__sig":"{}"}}"#, sig);
        let request = FrameRequest::continuation(FrameMessage::with_state(forged));

        match roundtrip(&mut stream, &request).await {
            FrameResponse::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidStateSignature),
            other => panic!("unexpected response: {:?}", other),
        }

        let again = state_of(roundtrip(&mut stream, &FrameRequest::initial()).await);
        assert!(again.contains(r#""count":0"#));
    }

    #[tokio::test]
    async fn unsigned_state_without_secret() {
        let config = ServerConfig::default().with_initial_state(json!({"count": 0}));
        let addr = spawn_server(config).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let request = FrameRequest::continuation(FrameMessage::with_state(r#"{"count":41}"#));
        let state = state_of(roundtrip(&mut stream, &request).await);
        assert_eq!(state, r#"{"count":42}"#);
    }

    #[tokio::test]
    async fn malformed_request_gets_error_response() {
        let addr = spawn_server(ServerConfig::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let body = b"{\"method\":\"DELETE\"}";
        stream.write_all(&(body.len() as u32).to_be_bytes()).await.unwrap();
        stream.write_all(body).await.unwrap();

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut buf = vec![0u8; u32::from_be_bytes(len_buf) as usize];
        stream.read_exact(&mut buf).await.unwrap();
        let response: FrameResponse = serde_json::from_slice(&buf).unwrap();

        assert!(matches!(
            response,
            FrameResponse::Error { code: ErrorCode::MalformedRequest, .. }
        ));
    }

    #[tokio::test]
    async fn oversized_frame_closes_connection() {
        let mut config = ServerConfig::default();
        config.max_message_size = 16;
        let addr = spawn_server(config).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(&1024u32.to_be_bytes()).await.unwrap();

        let mut buf = [0u8; 4];
        let read = stream.read(&mut buf).await.unwrap_or(0);
        assert_eq!(read, 0);
    }

    #[tokio::test]
    async fn idle_connection_is_closed_cleanly() {
        let mut config = ServerConfig::default();
        config.read_timeout = std::time::Duration::from_millis(50);

        let (mut near, _far) = tokio::io::duplex(64);
        let read = read_frame(&mut near, &config).await.unwrap();
        assert!(read.is_none());

        let addr = spawn_server(config).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 4];
        let read = tokio::time::timeout(std::time::Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("server should drop an idle client")
            .unwrap_or(0);
        assert_eq!(read, 0);
    }

    #[tokio::test]
    async fn process_request_reports_handler_failure() {
        let middleware = StateMiddleware::new();
        let handler: FrameHandler = Arc::new(|_: FrameContext| {
            Box::pin(async { Err(StateError::Handler("boom".to_string())) }) as HandlerFuture
        });

        let response = process_request(
            &middleware,
            &ServerConfig::default(),
            &handler,
            FrameRequest::initial(),
        )
        .await;

        assert!(matches!(
            response,
            FrameResponse::Error { code: ErrorCode::HandlerFailed, .. }
        ));
    }
}
