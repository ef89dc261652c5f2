//! Content Parser.
//!
//! Recovers the payload of an envelope without verifying its signature.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::Value as Cbor;
use coset::{AsCborValue, CoseSign1};
use serde_json::Value;

use crate::cbor;
use crate::error::EnvelopeError;
use crate::format::{CredentialFormat, FormatDetector};

/// CBOR tag of a CWT.
const CWT_TAG: u64 = 61;
/// CBOR tag of a COSE_Sign1 structure.
const COSE_SIGN1_TAG: u64 = 18;

/// Decoded payload of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JWT claims.
    Json(Value),
    /// Raw CWT claim set bytes.
    Cbor(Vec<u8>),
}

impl Payload {
    /// JSON view of the payload; CWT claims are converted from CBOR.
    pub fn to_json(&self) -> Result<Value, EnvelopeError> {
        match self {
            Self::Json(value) => Ok(value.clone()),
            Self::Cbor(bytes) => cbor::claims_to_json(bytes),
        }
    }
}

/// A raw credential whose envelope format has been detected and decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCredential {
    pub format: CredentialFormat,
    pub payload: Payload,
}

/// The three segments of a compact JWS.
#[derive(Debug, Clone, PartialEq)]
pub struct JwtParts {
    pub header: Value,
    pub payload: Value,
    /// `header.payload` exactly as received; the bytes the signature covers.
    pub signing_input: String,
    pub signature: Vec<u8>,
}

/// Detect the envelope of `raw` and decode its payload.
pub fn decode(raw: &str, detector: &FormatDetector) -> Result<DecodedCredential, EnvelopeError> {
    let format = detector.detect(raw)?;
    let payload = match format {
        CredentialFormat::Jwt => Payload::Json(parse_jwt(raw)?),
        CredentialFormat::Cwt => Payload::Cbor(parse_cwt(raw)?),
    };
    tracing::debug!(format = %format, "decoded credential envelope");
    Ok(DecodedCredential { format, payload })
}

/// Decode the claims (middle segment) of a JWT.
pub fn parse_jwt(raw: &str) -> Result<Value, EnvelopeError> {
    let segments = jwt_segments(raw)?;
    decode_json_segment(segments[1], "payload")
}

/// Split a JWT into its decoded header, payload and signature.
pub fn split_jwt(raw: &str) -> Result<JwtParts, EnvelopeError> {
    let segments = jwt_segments(raw)?;
    let header = decode_json_segment(segments[0], "header")?;
    let payload = decode_json_segment(segments[1], "payload")?;
    let signature = URL_SAFE_NO_PAD
        .decode(segments[2].trim_end_matches('='))
        .map_err(|e| EnvelopeError::MalformedJwt(format!("invalid signature encoding: {}", e)))?;

    Ok(JwtParts {
        header,
        payload,
        signing_input: format!("{}.{}", segments[0], segments[1]),
        signature,
    })
}

fn jwt_segments(raw: &str) -> Result<Vec<&str>, EnvelopeError> {
    let token = raw.trim();
    let token = token.split('~').next().unwrap_or(token);
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(EnvelopeError::MalformedJwt(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    Ok(segments)
}

fn decode_json_segment(segment: &str, name: &str) -> Result<Value, EnvelopeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| EnvelopeError::MalformedJwt(format!("invalid {} encoding: {}", name, e)))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| EnvelopeError::MalformedJwt(format!("invalid {} JSON: {}", name, e)))?;
    if !value.is_object() {
        return Err(EnvelopeError::MalformedJwt(format!(
            "{} is not a JSON object",
            name
        )));
    }
    Ok(value)
}

/// Extract the payload bytes of a hex encoded, tagged or untagged COSE_Sign1.
///
/// A missing or empty payload means a broken or hostile encoder, never a
/// normal "not found" case.
pub fn parse_cwt(raw: &str) -> Result<Vec<u8>, EnvelopeError> {
    let bytes = hex::decode(raw.trim())
        .map_err(|e| EnvelopeError::MalformedCwt(format!("invalid hex: {}", e)))?;
    let mut value: Cbor = ciborium::from_reader(bytes.as_slice())
        .map_err(|e| EnvelopeError::MalformedCwt(format!("invalid CBOR: {}", e)))?;

    let value = loop {
        match value {
            Cbor::Tag(CWT_TAG | COSE_SIGN1_TAG, inner) => value = *inner,
            Cbor::Tag(tag, _) => {
                return Err(EnvelopeError::MalformedCwt(format!(
                    "unexpected CBOR tag {}",
                    tag
                )))
            }
            other => break other,
        }
    };

    let sign1 = CoseSign1::from_cbor_value(value)
        .map_err(|e| EnvelopeError::MalformedCwt(format!("not a COSE_Sign1 structure: {:?}", e)))?;

    match sign1.payload {
        Some(payload) if !payload.is_empty() => Ok(payload),
        _ => Err(EnvelopeError::MalformedCwt(
            "COSE_Sign1 payload is absent".into(),
        )),
    }
}
