//! State middleware.
//!
//! One pipeline step that recovers state from the inbound message, hands it
//! to the next step on the [`FrameContext`], and serializes whatever state
//! comes back into the outbound result:
//!
//! ```text
//! inbound:   no message            -> initial state
//!            unparseable state     -> initial state + warning
//!            unsigned envelope     -> parsed value
//!            signed, no secret     -> data + warning
//!            signed, secret        -> data, or InvalidStateSignatureError
//! outbound:  result.state or recovered state -> envelope text (signed if secret)
//! ```

use std::future::Future;

use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::error::StateResult;
use crate::message::{FrameRequest, FrameResult, StatefulResult};
use crate::security::{HmacSha256Provider, SignatureProvider, StateSecret};

/// Per-request context handed down the pipeline.
#[derive(Debug, Clone)]
pub struct FrameContext {
    /// The inbound request.
    pub request: FrameRequest,
    /// State used when nothing usable arrives with the request.
    pub initial_state: Value,
    /// Enables signing and verification when present.
    pub state_signing_secret: Option<StateSecret>,
    /// Recovered state; populated by [`StateMiddleware::handle`] before the
    /// next step runs.
    pub state: Value,
}

impl FrameContext {
    /// Create a context with an empty initial state and no secret.
    pub fn new(request: FrameRequest) -> Self {
        Self {
            request,
            initial_state: Value::Object(Map::new()),
            state_signing_secret: None,
            state: Value::Null,
        }
    }

    /// Set the initial state.
    pub fn with_initial_state(mut self, initial_state: Value) -> Self {
        self.initial_state = initial_state;
        self
    }

    /// Set the signing secret.
    pub fn with_state_signing_secret(mut self, secret: impl Into<StateSecret>) -> Self {
        self.state_signing_secret = Some(secret.into());
        self
    }

    /// True when no prior message is carried.
    pub fn is_initial(&self) -> bool {
        self.request.is_initial()
    }
}

/// Recoverable anomalies reported while handling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateWarning {
    /// The inbound state was not valid envelope text.
    ParseFailed,
    /// A signed envelope arrived but no secret is configured to check it.
    SignedWithoutSecret,
    /// The handler returned state on the initial request.
    StateOnInitialRequest,
}

impl std::fmt::Display for StateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailed => write!(
                f,
                "Failed to parse state from frame message, are you sure that the state was constructed by framestate?"
            ),
            Self::SignedWithoutSecret => write!(
                f,
                "State is signed but no secret is provided, the signature cannot be verified"
            ),
            Self::StateOnInitialRequest => write!(
                f,
                "State is not supported on initial request, use the initial state instead"
            ),
        }
    }
}

/// Receives state warnings.
pub trait StateObserver: Send + Sync {
    fn warn(&self, warning: StateWarning);
}

/// Observer that forwards warnings to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StateObserver for TracingObserver {
    fn warn(&self, warning: StateWarning) {
        tracing::warn!("{}", warning);
    }
}

/// Pipeline step that round-trips state through the response.
pub struct StateMiddleware {
    signer: Box<dyn SignatureProvider>,
    observer: Box<dyn StateObserver>,
}

impl StateMiddleware {
    /// Create with HMAC-SHA-256 signing and `tracing` warnings.
    pub fn new() -> Self {
        Self {
            signer: Box::new(HmacSha256Provider),
            observer: Box::new(TracingObserver),
        }
    }

    /// Use a custom signature provider.
    pub fn with_signer(mut self, signer: impl SignatureProvider + 'static) -> Self {
        self.signer = Box::new(signer);
        self
    }

    /// Use a custom warning observer.
    pub fn with_observer(mut self, observer: impl StateObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Run the step: recover state, call `next`, seal the outbound state.
    ///
    /// Fails with [`StateError::InvalidSignature`](crate::StateError::InvalidSignature)
    /// before `next` is called when signed state does not verify.
    pub async fn handle<F, Fut>(&self, mut ctx: FrameContext, next: F) -> StateResult<StatefulResult>
    where
        F: FnOnce(FrameContext) -> Fut,
        Fut: Future<Output = StateResult<FrameResult>>,
    {
        let recovered = self.recover_state(&ctx)?;
        let initial = ctx.is_initial();
        let secret = ctx.state_signing_secret.clone();

        ctx.state = recovered.clone();
        let FrameResult { state, mut fields } = next(ctx).await?;

        // The sealed text owns the `state` key; a raw `state` field counts as
        // handler state unless `state` was set directly.
        let field_state = fields.remove("state");
        let state = state.or(field_state);

        if initial && state.is_some() {
            self.observer.warn(StateWarning::StateOnInitialRequest);
        }

        let state = self.seal_state(state.unwrap_or(recovered), secret.as_ref())?;
        Ok(StatefulResult { fields, state })
    }

    /// Inbound phase: the state the next step should see.
    pub fn recover_state(&self, ctx: &FrameContext) -> StateResult<Value> {
        let Some(message) = ctx.request.message.as_ref() else {
            return Ok(ctx.initial_state.clone());
        };
        let Some(raw) = message.state.as_ref() else {
            tracing::debug!("frame message carries no state");
            return Ok(ctx.initial_state.clone());
        };

        let envelope = match raw.as_str().map(Envelope::parse) {
            Some(Ok(envelope)) => envelope,
            _ => {
                self.observer.warn(StateWarning::ParseFailed);
                return Ok(ctx.initial_state.clone());
            }
        };

        if envelope.is_signed() {
            match ctx.state_signing_secret.as_ref() {
                Some(secret) => {
                    envelope.verify(secret, self.signer.as_ref())?;
                    tracing::debug!("state signature verified");
                }
                None => self.observer.warn(StateWarning::SignedWithoutSecret),
            }
        }

        Ok(envelope.into_data())
    }

    /// Outbound phase: envelope text for `state`.
    pub fn seal_state(&self, state: Value, secret: Option<&StateSecret>) -> StateResult<String> {
        Envelope::seal(state, secret, self.signer.as_ref())?.to_text()
    }
}

impl Default for StateMiddleware {
    fn default() -> Self {
        Self::new()
    }
}
