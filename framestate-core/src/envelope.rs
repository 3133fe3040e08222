//! Wire representation of frame state.
//!
//! State travels as JSON text in one of two shapes:
//!
//! ```text
//! Unsigned:  <state JSON>
//! Signed:    {"data": <state JSON>, "__sig": "<hex HMAC-SHA-256 of JSON(data)>"}
//! ```
//!
//! The shape is detected structurally: any JSON object holding both a `data`
//! and a `__sig` key is a signed envelope, everything else is unsigned state.

use serde::Serialize;
use serde_json::Value;

use crate::error::{InvalidStateSignatureError, StateResult};
use crate::security::{SignatureProvider, StateSecret};

/// Key holding the state inside a signed envelope.
pub const DATA_FIELD: &str = "data";

/// Key holding the hex signature inside a signed envelope.
pub const SIGNATURE_FIELD: &str = "__sig";

/// Decoded state envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Plain state, no integrity protection.
    Unsigned(Value),
    /// State with a hex-encoded digest over `JSON(data)`.
    Signed { data: Value, sig: String },
}

#[derive(Serialize)]
struct SignedWire<'a> {
    data: &'a Value,
    #[serde(rename = "__sig")]
    sig: &'a str,
}

impl Envelope {
    /// Parse envelope text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Value>(text).map(Self::from_value)
    }

    /// Classify an already-parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map)
                if map.contains_key(DATA_FIELD) && map.contains_key(SIGNATURE_FIELD) =>
            {
                let data = map.remove(DATA_FIELD).unwrap_or(Value::Null);
                // A non-string signature can never verify.
                let sig = match map.remove(SIGNATURE_FIELD) {
                    Some(Value::String(s)) => s,
                    _ => String::new(),
                };
                Self::Signed { data, sig }
            }
            other => Self::Unsigned(other),
        }
    }

    /// Build the envelope for outbound `state`, signing it when a secret is given.
    pub fn seal(
        state: Value,
        secret: Option<&StateSecret>,
        signer: &dyn SignatureProvider,
    ) -> StateResult<Self> {
        match secret {
            Some(secret) => {
                let payload = serde_json::to_string(&state)?;
                let sig = signer.sign(payload.as_bytes(), secret);
                Ok(Self::Signed { data: state, sig })
            }
            None => Ok(Self::Unsigned(state)),
        }
    }

    /// Check the signature of a signed envelope. Unsigned envelopes pass.
    pub fn verify(
        &self,
        secret: &StateSecret,
        signer: &dyn SignatureProvider,
    ) -> StateResult<()> {
        match self {
            Self::Unsigned(_) => Ok(()),
            Self::Signed { data, sig } => {
                let payload = serde_json::to_string(data)?;
                if signer.verify(payload.as_bytes(), sig, secret) {
                    Ok(())
                } else {
                    Err(InvalidStateSignatureError.into())
                }
            }
        }
    }

    /// Whether this envelope carries a signature.
    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed { .. })
    }

    /// Take the carried state, discarding any signature.
    pub fn into_data(self) -> Value {
        match self {
            Self::Unsigned(data) | Self::Signed { data, .. } => data,
        }
    }

    /// Serialize to envelope text.
    pub fn to_text(&self) -> StateResult<String> {
        let text = match self {
            Self::Unsigned(data) => serde_json::to_string(data)?,
            Self::Signed { data, sig } => serde_json::to_string(&SignedWire { data, sig })?,
        };
        Ok(text)
    }
}
