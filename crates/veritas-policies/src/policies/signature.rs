//! `signature`: JWT signature verification through an injected verifier.
//!
//! The engine does not own key material or DID resolution. It hands the
//! split JWT to a [`SignatureVerifier`]; [`Ed25519KeyVerifier`] is the
//! built-in verifier for EdDSA tokens signed by statically trusted keys.

use async_trait::async_trait;
use dashmap::DashMap;
use ed25519_dalek::{Signature, VerifyingKey};
use serde_json::{json, Value};
use std::sync::Arc;
use veritas_core::{PolicyError, PolicyValue};
use veritas_envelope::{split_jwt, CredentialFormat, FormatDetector, JwtParts};

use crate::policy::{InputKind, Policy, PolicyContext};

pub const NAME: &str = "signature";

/// Signature verification capability.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verify the signature over `parts.signing_input`. On success returns
    /// the identifier of the key that verified it.
    async fn verify_jwt(&self, parts: &JwtParts) -> Result<String, PolicyError>;
}

/// Ed25519 (`EdDSA`) verifier over a set of trusted public keys.
///
/// Keys are looked up by the header `kid`, then by the payload `iss`.
#[derive(Default)]
pub struct Ed25519KeyVerifier {
    keys: DashMap<String, VerifyingKey>,
}

impl Ed25519KeyVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `key` for tokens whose `kid` or `iss` equals `id`.
    pub fn add_trusted_key(&self, id: impl Into<String>, key: VerifyingKey) {
        self.keys.insert(id.into(), key);
    }

    /// Trust a hex encoded 32 byte public key.
    pub fn add_trusted_key_hex(&self, id: impl Into<String>, key_hex: &str) -> Result<(), PolicyError> {
        let bytes = hex::decode(key_hex.trim())
            .map_err(|e| PolicyError::Other(format!("invalid public key hex: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PolicyError::Other("public key must be 32 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| PolicyError::Other(format!("invalid public key: {}", e)))?;
        self.add_trusted_key(id, key);
        Ok(())
    }

    pub fn trusted_key_count(&self) -> usize {
        self.keys.len()
    }

    fn key_for(&self, parts: &JwtParts) -> Option<(String, VerifyingKey)> {
        let candidates = [
            parts.header.get("kid").and_then(Value::as_str),
            parts.payload.get("iss").and_then(Value::as_str),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|id| self.keys.get(id).map(|key| (id.to_string(), *key)))
    }
}

#[async_trait]
impl SignatureVerifier for Ed25519KeyVerifier {
    async fn verify_jwt(&self, parts: &JwtParts) -> Result<String, PolicyError> {
        match parts.header.get("alg").and_then(Value::as_str) {
            Some("EdDSA") | Some("Ed25519") => {}
            other => {
                return Err(PolicyError::InvalidSignature(format!(
                    "unsupported algorithm {:?}",
                    other
                )))
            }
        }

        let (key_id, key) = self
            .key_for(parts)
            .ok_or_else(|| PolicyError::InvalidSignature("no trusted key for token".into()))?;
        let signature = Signature::from_slice(&parts.signature)
            .map_err(|e| PolicyError::InvalidSignature(format!("malformed signature: {}", e)))?;
        key.verify_strict(parts.signing_input.as_bytes(), &signature)
            .map_err(|_| PolicyError::InvalidSignature("signature does not match".into()))?;
        Ok(key_id)
    }
}

pub struct SignaturePolicy {
    verifier: Arc<dyn SignatureVerifier>,
    detector: FormatDetector,
}

impl SignaturePolicy {
    pub fn new(verifier: Arc<dyn SignatureVerifier>, detector: FormatDetector) -> Self {
        Self { verifier, detector }
    }
}

#[async_trait]
impl Policy for SignaturePolicy {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Verifies the credential signature"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Raw
    }

    async fn verify(
        &self,
        data: &Value,
        _args: Option<&Value>,
        _context: &PolicyContext,
    ) -> Result<PolicyValue, PolicyError> {
        let raw = data.as_str().ok_or_else(|| PolicyError::UnsupportedInput {
            policy: NAME.into(),
            found: "non-string input".into(),
        })?;

        match self.detector.detect(raw)? {
            CredentialFormat::Jwt => {}
            CredentialFormat::Cwt => {
                return Err(PolicyError::UnsupportedInput {
                    policy: NAME.into(),
                    found: "cwt".into(),
                })
            }
        }

        let parts = split_jwt(raw)?;
        let key_id = self.verifier.verify_jwt(&parts).await?;
        tracing::debug!(key = %key_id, "signature verified");
        Ok(PolicyValue::Json(json!({
            "alg": parts.header.get("alg").cloned().unwrap_or(Value::Null),
            "key": key_id,
        })))
    }
}
