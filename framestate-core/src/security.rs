//! Signature primitives for frame state.
//!
//! Implements:
//! - HMAC-SHA-256 digests over arbitrary bytes
//! - Constant-time digest verification
//! - Hex encoding of digests for the `__sig` envelope field

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Shared symmetric key used to sign and verify state.
#[derive(Clone, PartialEq, Eq)]
pub struct StateSecret(Vec<u8>);

impl StateSecret {
    /// Wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for StateSecret {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for StateSecret {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for StateSecret {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for StateSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StateSecret(<{} bytes redacted>)", self.0.len())
    }
}

fn keyed(secret: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size")
}

/// Compute the HMAC-SHA-256 digest of `data` under `secret`.
pub fn sign(data: &[u8], secret: &[u8]) -> [u8; DIGEST_LEN] {
    let mut mac = keyed(secret);
    mac.update(data);
    let bytes = mac.finalize().into_bytes();
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&bytes);
    digest
}

/// Verify `digest` against the HMAC-SHA-256 of `data` under `secret`.
///
/// The comparison is constant-time. A digest of the wrong length never
/// verifies.
pub fn verify(data: &[u8], digest: &[u8], secret: &[u8]) -> bool {
    let mut mac = keyed(secret);
    mac.update(data);
    mac.verify_slice(digest).is_ok()
}

/// Hex-encoded digest, as stored in the `__sig` envelope field.
pub fn sign_hex(data: &[u8], secret: &[u8]) -> String {
    hex::encode(sign(data, secret))
}

/// Verify a hex-encoded digest. Anything that is not valid hex fails.
pub fn verify_hex(data: &[u8], digest_hex: &str, secret: &[u8]) -> bool {
    match hex::decode(digest_hex) {
        Ok(digest) => verify(data, &digest, secret),
        Err(_) => false,
    }
}

/// Keyed digest capability consumed by the state middleware.
///
/// Implementations must be deterministic: the same `(data, secret)` pair
/// always yields the same digest.
pub trait SignatureProvider: Send + Sync {
    /// Hex-encoded digest of `data` under `secret`.
    fn sign(&self, data: &[u8], secret: &StateSecret) -> String;

    /// Check a hex-encoded digest of `data` under `secret`.
    fn verify(&self, data: &[u8], signature: &str, secret: &StateSecret) -> bool;
}

/// HMAC-SHA-256 provider with hex-encoded signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha256Provider;

impl SignatureProvider for HmacSha256Provider {
    fn sign(&self, data: &[u8], secret: &StateSecret) -> String {
        sign_hex(data, secret.as_bytes())
    }

    fn verify(&self, data: &[u8], signature: &str, secret: &StateSecret) -> bool {
        verify_hex(data, signature, secret.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let digest = sign_hex(b"The quick brown fox jumps over the lazy dog", b"key");
        assert_eq!(
            digest,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn sign_deterministic() {
        let a = sign(b"{\"foo\":\"bar\"}", b"test");
        let b = sign(b"{\"foo\":\"bar\"}", b"test");
        assert_eq!(a, b);
        assert_eq!(
            hex::encode(a),
            "51fb0f2895400032daf856082634c635f5fe21a2848b4b2337ebeb3fc0e9c05c"
        );
    }

    #[test]
    fn verify_roundtrip() {
        let digest = sign(b"payload", b"secret");
        assert!(verify(b"payload", &digest, b"secret"));
    }

    #[test]
    fn verify_wrong_key() {
        let digest = sign(b"payload", b"secret1");
        assert!(!verify(b"payload", &digest, b"secret2"));
    }

    #[test]
    fn verify_tampered_data() {
        let digest = sign(b"payload", b"secret");
        assert!(!verify(b"payload!", &digest, b"secret"));
    }

    #[test]
    fn verify_truncated_digest() {
        let digest = sign(b"payload", b"secret");
        assert!(!verify(b"payload", &digest[..16], b"secret"));
        assert!(!verify(b"payload", &[], b"secret"));
    }

    #[test]
    fn verify_hex_rejects_garbage() {
        assert!(!verify_hex(b"payload", "not hex at all", b"secret"));
        assert!(!verify_hex(b"payload", "", b"secret"));
    }

    #[test]
    fn empty_secret_is_usable() {
        let sig = sign_hex(b"payload", b"");
        assert!(verify_hex(b"payload", &sig, b""));
        assert!(!verify_hex(b"payload", &sig, b"x"));
    }

    #[test]
    fn provider_matches_free_functions() {
        let secret = StateSecret::from("test");
        let provider = HmacSha256Provider;
        let sig = provider.sign(b"{\"foo\":\"bar\"}", &secret);
        assert_eq!(sig, sign_hex(b"{\"foo\":\"bar\"}", b"test"));
        assert!(provider.verify(b"{\"foo\":\"bar\"}", &sig, &secret));
        assert!(!provider.verify(b"{\"foo\":\"baz\"}", &sig, &secret));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = StateSecret::from("hunter2");
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("7 bytes"));
    }
}
