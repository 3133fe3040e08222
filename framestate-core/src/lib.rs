//! # framestate-core
//!
//! Signed, round-trippable client-side state for stateless frame handlers.
//!
//! State is serialized into the response, optionally HMAC-signed, carried by
//! the client, and recovered on the next request. This crate provides the
//! envelope codec, the signature primitives and the [`StateMiddleware`]
//! pipeline step that ties them together.

pub mod envelope;
pub mod error;
pub mod message;
pub mod middleware;
pub mod security;

pub use envelope::Envelope;
pub use error::{ErrorCode, InvalidStateSignatureError, StateError, StateResult};
pub use message::{
    FrameMessage, FrameRequest, FrameResponse, FrameResult, RequestMethod, StatefulResult,
};
pub use middleware::{FrameContext, StateMiddleware, StateObserver, StateWarning, TracingObserver};
pub use security::{sign, sign_hex, verify, verify_hex, HmacSha256Provider, SignatureProvider, StateSecret};
