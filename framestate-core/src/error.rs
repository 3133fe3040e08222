//! Error types and wire error codes for frame state.

use thiserror::Error;

/// Raised when a signed state envelope fails verification.
///
/// The inbound `__sig` did not match the digest of `data` under the
/// configured secret: wrong secret, tampered data or tampered signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
#[error("invalid state signature")]
pub struct InvalidStateSignatureError;

/// Error codes carried in error responses on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Signed state did not verify.
    InvalidStateSignature,
    /// Malformed frame or invalid structure.
    MalformedRequest,
    /// The frame handler failed.
    HandlerFailed,
    /// Anything else.
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidStateSignature => write!(f, "invalid_state_signature"),
            Self::MalformedRequest => write!(f, "malformed_request"),
            Self::HandlerFailed => write!(f, "handler_failed"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Frame state errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// Signature verification of inbound state failed.
    #[error(transparent)]
    InvalidSignature(#[from] InvalidStateSignatureError),

    /// Protocol-level error (malformed frame, unexpected response).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Validation error (size limits, configuration).
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport error (connection, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// The downstream frame handler failed.
    #[error("handler error: {0}")]
    Handler(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StateError {
    /// True when this is a state signature failure.
    pub fn is_invalid_signature(&self) -> bool {
        matches!(self, Self::InvalidSignature(_))
    }

    /// Wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSignature(_) => ErrorCode::InvalidStateSignature,
            Self::Protocol(_) | Self::Validation(_) | Self::Serialization(_) => {
                ErrorCode::MalformedRequest
            }
            Self::Handler(_) => ErrorCode::HandlerFailed,
            Self::Transport(_) => ErrorCode::Internal,
        }
    }
}

/// Result type alias for frame state operations.
pub type StateResult<T> = Result<T, StateError>;
