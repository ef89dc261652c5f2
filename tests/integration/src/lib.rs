//! Fixtures shared by the integration tests: credential envelopes, encoded
//! status lists and an instrumented fetcher.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use ciborium::Value as Cbor;
use coset::{CoseSign1Builder, TaggedCborSerializable};
use ed25519_dalek::{Signer, SigningKey};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde_json::{json, Value};
use veritas_core::EngineConfig;
use veritas_envelope::FormatDetector;
use veritas_policies::{PolicyRegistry, PolicyRunner};
use veritas_status::{FetchError, StaticFetcher, StatusListFetcher, StatusValidator};

/// Number of entries in the W3C fixture lists (16 KiB of one-bit entries).
pub const W3C_LIST_ENTRIES: usize = 131_072;

// =========================================================================
// Envelopes
// =========================================================================

fn b64_json(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string())
}

/// A JWT whose signature is not meant to verify.
pub fn unsigned_jwt(payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        b64_json(&json!({"alg": "EdDSA", "typ": "JWT"})),
        b64_json(payload),
        URL_SAFE_NO_PAD.encode(b"not-a-signature")
    )
}

/// An EdDSA JWT signed with `key`, optionally carrying a `kid` header.
pub fn signed_jwt(key: &SigningKey, kid: Option<&str>, payload: &Value) -> String {
    let header = match kid {
        Some(kid) => json!({"alg": "EdDSA", "typ": "JWT", "kid": kid}),
        None => json!({"alg": "EdDSA", "typ": "JWT"}),
    };
    let signing_input = format!("{}.{}", b64_json(&header), b64_json(payload));
    let signature = key.sign(signing_input.as_bytes());
    format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

/// Hex encoded, tagged COSE_Sign1 whose payload is the CBOR `claims`.
pub fn cwt_hex(claims: &Cbor) -> String {
    let mut payload = Vec::new();
    ciborium::into_writer(claims, &mut payload).expect("encode claims");
    let sign1 = CoseSign1Builder::new()
        .payload(payload)
        .signature(vec![0u8; 64])
        .build();
    hex::encode(sign1.to_tagged_vec().expect("encode COSE_Sign1"))
}

// =========================================================================
// Status lists
// =========================================================================

/// Gzip then base64url, as W3C StatusList2021 and Bitstring lists are encoded.
pub fn gzip_base64url(bytes: &[u8]) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip");
    URL_SAFE_NO_PAD.encode(encoder.finish().expect("gzip"))
}

/// Zlib then base64url, as IETF token status lists are encoded.
pub fn zlib_base64url(bytes: &[u8]) -> String {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("zlib");
    URL_SAFE_NO_PAD.encode(encoder.finish().expect("zlib"))
}

/// One-bit, most-significant-bit-first list with `set` indices asserted.
pub fn msb_bits(entries: usize, set: &[usize]) -> Vec<u8> {
    let mut bytes = vec![0u8; entries.div_ceil(8)];
    for &index in set {
        bytes[index / 8] |= 0x80 >> (index % 8);
    }
    bytes
}

/// Least-significant-bit-first list of `bits`-wide values.
pub fn lsb_values(bits: u8, values: &[u8]) -> Vec<u8> {
    let per_byte = 8 / bits as usize;
    let mut bytes = vec![0u8; values.len().div_ceil(per_byte)];
    for (index, value) in values.iter().enumerate() {
        let shift = (index % per_byte) * bits as usize;
        bytes[index / per_byte] |= value << shift;
    }
    bytes
}

/// A StatusList2021 credential with the `revoked` indices set.
pub fn status_list_2021_credential(url: &str, purpose: &str, revoked: &[usize]) -> Value {
    json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "id": url,
        "type": ["VerifiableCredential", "StatusList2021Credential"],
        "issuer": "did:example:issuer",
        "credentialSubject": {
            "id": format!("{}#list", url),
            "type": "StatusList2021",
            "statusPurpose": purpose,
            "encodedList": format!("u{}", gzip_base64url(&msb_bits(W3C_LIST_ENTRIES, revoked))),
        }
    })
}

/// Claim set of an IETF token status list.
pub fn token_status_list(bits: u8, values: &[u8]) -> Value {
    json!({
        "sub": "https://example.com/statuslists/1",
        "status_list": {"bits": bits, "lst": zlib_base64url(&lsb_values(bits, values))}
    })
}

/// A StatusList2021 `credentialStatus` entry.
pub fn status_2021_entry(url: &str, purpose: &str, index: usize) -> Value {
    json!({
        "id": format!("{}#{}", url, index),
        "type": "StatusList2021Entry",
        "statusPurpose": purpose,
        "statusListIndex": index.to_string(),
        "statusListCredential": url,
    })
}

/// A JWT-VC payload of the given type carrying `status`.
pub fn credential_payload(issuer: &str, credential_type: &str, status: Option<Value>) -> Value {
    let mut vc = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential", credential_type],
        "issuer": issuer,
        "credentialSubject": {"id": "did:example:holder"},
        "expirationDate": "2999-01-01T00:00:00Z",
    });
    if let Some(status) = status {
        vc["credentialStatus"] = status;
    }
    json!({"iss": issuer, "sub": "did:example:holder", "vc": vc})
}

// =========================================================================
// Engine
// =========================================================================

/// Fetcher that counts calls and optionally delays each response.
pub struct CountingFetcher {
    inner: StaticFetcher,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(inner: StaticFetcher) -> Self {
        Self::with_delay(inner, Duration::ZERO)
    }

    pub fn with_delay(inner: StaticFetcher, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusListFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.fetch(url).await
    }
}

/// A runner with every built-in policy, fetching through `fetcher` with
/// the default single-flight cache in front.
pub fn runner_with(fetcher: Arc<CountingFetcher>, config: &EngineConfig) -> PolicyRunner {
    let validator = StatusValidator::with_config(fetcher, config);
    let registry = PolicyRegistry::with_builtins(validator);
    tracing::debug!(policies = registry.len(), "built test runner");
    PolicyRunner::new(Arc::new(registry), config)
}

/// Same as [`runner_with`], registering `verifier` for the `signature` policy.
pub fn runner_with_verifier(
    fetcher: Arc<CountingFetcher>,
    verifier: Arc<dyn veritas_policies::policies::SignatureVerifier>,
    config: &EngineConfig,
) -> PolicyRunner {
    let validator = StatusValidator::with_config(fetcher, config);
    let registry = PolicyRegistry::with_builtins(validator);
    registry.register_signature_verifier(verifier, FormatDetector::new(&config.envelope));
    PolicyRunner::new(Arc::new(registry), config)
}
