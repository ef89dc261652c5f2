//! Reading fetched status list documents.
//!
//! A status list credential arrives as a JWT, a hex or binary CWT, or a
//! plain JSON document. Whatever the envelope, the part the engine needs
//! is the encoded list plus its metadata.

use serde_json::Value;
use veritas_envelope::{decode, CredentialFormat, FormatDetector};

use crate::entry::StatusListType;
use crate::error::StatusError;
use crate::expansion::{expand, ExpandedStatusList};

/// CWT claim key of the IETF `status_list` claim.
pub const CWT_STATUS_LIST_CLAIM: &str = "65533";

/// Metadata and encoded list of a fetched status list document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusListContent {
    /// W3C status list credential subject.
    W3c {
        list_type: StatusListType,
        /// Purposes the list declares; empty for RevocationList2020.
        purposes: Vec<String>,
        encoded_list: String,
        status_size: Option<u8>,
    },
    /// IETF token status list claim.
    Ietf { bits: u8, lst: String },
}

impl StatusListContent {
    pub fn list_type(&self) -> StatusListType {
        match self {
            Self::W3c { list_type, .. } => *list_type,
            Self::Ietf { .. } => StatusListType::TokenStatusList,
        }
    }

    /// Bits per entry declared by the list itself.
    pub fn status_size(&self) -> Option<u8> {
        match self {
            Self::W3c { status_size, .. } => *status_size,
            Self::Ietf { bits, .. } => Some(*bits),
        }
    }

    /// Whether the list serves `purpose`. Lists that declare no purpose
    /// serve any.
    pub fn supports_purpose(&self, purpose: &str) -> bool {
        match self {
            Self::W3c { purposes, .. } => {
                purposes.is_empty() || purposes.iter().any(|p| p == purpose)
            }
            Self::Ietf { .. } => true,
        }
    }

    /// Decompress the list. `status_size` from the entry wins over the
    /// list's own declaration; the fallback is one bit per entry.
    pub fn expand(&self, status_size: Option<u8>) -> Result<ExpandedStatusList, StatusError> {
        let status_size = status_size.or(self.status_size()).unwrap_or(1);
        let (list_type, encoded) = match self {
            Self::W3c {
                list_type,
                encoded_list,
                ..
            } => (*list_type, encoded_list.as_str()),
            Self::Ietf { lst, .. } => (StatusListType::TokenStatusList, lst.as_str()),
        };
        let order = list_type.bit_order();
        let bytes = expand(list_type, encoded)?;
        Ok(ExpandedStatusList::new(bytes, status_size, order))
    }
}

/// Read the status list carried by a fetched document.
pub fn read_status_list(
    body: &[u8],
    detector: &FormatDetector,
) -> Result<StatusListContent, StatusError> {
    let document = match std::str::from_utf8(body) {
        Ok(text) => {
            let text = text.trim();
            if text.starts_with('{') {
                serde_json::from_str::<Value>(text).map_err(|e| {
                    StatusError::InvalidStatusList(format!("invalid JSON document: {}", e))
                })?
            } else {
                envelope_payload(text, detector)?
            }
        }
        // Binary body: a CWT served as raw CBOR.
        Err(_) => envelope_payload(&hex::encode(body), detector)?,
    };

    status_list_from_document(&document)
}

fn envelope_payload(text: &str, detector: &FormatDetector) -> Result<Value, StatusError> {
    let decoded = decode(text, detector)?;
    if decoded.format == CredentialFormat::Cwt {
        tracing::debug!("status list served as CWT");
    }
    Ok(decoded.payload.to_json()?)
}

/// Pull the status list out of a decoded document.
pub fn status_list_from_document(document: &Value) -> Result<StatusListContent, StatusError> {
    if let Some(claim) = document
        .get("status_list")
        .or_else(|| document.get(CWT_STATUS_LIST_CLAIM))
    {
        return ietf_content(claim);
    }

    let credential = document.get("vc").unwrap_or(document);
    let subject = match credential.get("credentialSubject") {
        Some(Value::Array(subjects)) => subjects.first(),
        other => other,
    }
    .ok_or_else(|| {
        StatusError::InvalidStatusList("document has neither status_list nor credentialSubject".into())
    })?;

    w3c_content(credential, subject)
}

fn ietf_content(claim: &Value) -> Result<StatusListContent, StatusError> {
    let bits = claim
        .get("bits")
        .and_then(Value::as_u64)
        .ok_or_else(|| StatusError::InvalidStatusList("status_list.bits missing".into()))?;
    let bits = match bits {
        1 | 2 | 4 | 8 => bits as u8,
        other => {
            return Err(StatusError::InvalidStatusList(format!(
                "status_list.bits must be 1, 2, 4 or 8, got {}",
                other
            )))
        }
    };
    let lst = claim
        .get("lst")
        .and_then(Value::as_str)
        .ok_or_else(|| StatusError::InvalidStatusList("status_list.lst missing".into()))?;

    Ok(StatusListContent::Ietf {
        bits,
        lst: lst.to_string(),
    })
}

fn w3c_content(credential: &Value, subject: &Value) -> Result<StatusListContent, StatusError> {
    let list_type = subject
        .get("type")
        .and_then(Value::as_str)
        .and_then(StatusListType::from_type_name)
        .or_else(|| credential_list_type(credential))
        .ok_or_else(|| StatusError::InvalidStatusList("unknown status list type".into()))?;

    let encoded_list = subject
        .get("encodedList")
        .and_then(Value::as_str)
        .ok_or_else(|| StatusError::InvalidStatusList("encodedList missing".into()))?
        .to_string();

    let purposes = match subject.get("statusPurpose") {
        Some(Value::String(purpose)) => vec![purpose.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let status_size = match subject.get("statusSize").and_then(Value::as_u64) {
        Some(size) => Some(u8::try_from(size).map_err(|_| {
            StatusError::InvalidStatusList(format!("statusSize {} out of range", size))
        })?),
        None => None,
    };

    Ok(StatusListContent::W3c {
        list_type,
        purposes,
        encoded_list,
        status_size,
    })
}

/// List type from the credential's own `type` array.
fn credential_list_type(credential: &Value) -> Option<StatusListType> {
    match credential.get("type")? {
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find_map(StatusListType::from_type_name),
        Value::String(name) => StatusListType::from_type_name(name),
        _ => None,
    }
}
