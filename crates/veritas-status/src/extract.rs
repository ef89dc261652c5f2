//! Status Entry Extractor.
//!
//! Locates the status reference inside a decoded credential payload and
//! normalizes it into [`StatusListEntry`] records. A payload without any
//! status claim yields `None`: that is "no revocation mechanism", not an
//! error.

use serde_json::Value;

use crate::entry::{CredentialStatus, StatusListEntry, TokenStatusReference};
use crate::error::StatusError;

/// CWT claim key of the IETF `status` claim.
pub const CWT_STATUS_CLAIM: &str = "65535";

/// Locates a raw status claim in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEntryExtractor {
    /// A single top-level key.
    Direct(String),
    /// A nested key path.
    Path(Vec<String>),
    /// Extractors tried in order; the first non-empty result wins.
    Chain(Vec<StatusEntryExtractor>),
}

impl StatusEntryExtractor {
    /// W3C `credentialStatus`, at the top level or under `vc`.
    pub fn w3c() -> Self {
        Self::Chain(vec![
            Self::Direct("credentialStatus".into()),
            Self::path(&["vc", "credentialStatus"]),
        ])
    }

    /// IETF `status`, its CWT claim key, then the mdoc layout.
    pub fn ietf() -> Self {
        Self::Chain(vec![
            Self::Direct("status".into()),
            Self::Direct(CWT_STATUS_CLAIM.into()),
            Self::mdoc(),
        ])
    }

    /// Status in the mobile security object of a decoded mdoc.
    pub fn mdoc() -> Self {
        Self::Chain(vec![
            Self::path(&["issuerSigned", "issuerAuth", "payload", "status"]),
            Self::path(&["issuerAuth", "payload", "status"]),
            Self::path(&["mso", "status"]),
        ])
    }

    fn path(keys: &[&str]) -> Self {
        Self::Path(keys.iter().map(|k| k.to_string()).collect())
    }

    pub fn extract<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        match self {
            Self::Direct(key) => payload.get(key).filter(|v| !is_empty(v)),
            Self::Path(keys) => keys
                .iter()
                .try_fold(payload, |current, key| current.get(key))
                .filter(|v| !is_empty(v)),
            Self::Chain(extractors) => extractors.iter().find_map(|e| e.extract(payload)),
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Find and normalize every status entry of a credential payload.
///
/// W3C `credentialStatus` takes precedence over an IETF `status` claim.
pub fn extract_status_entries(payload: &Value) -> Result<Option<Vec<StatusListEntry>>, StatusError> {
    if let Some(raw) = StatusEntryExtractor::w3c().extract(payload) {
        let entries = match raw {
            Value::Array(items) => items
                .iter()
                .map(normalize_w3c)
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![normalize_w3c(other)?],
        };
        return Ok(Some(entries));
    }

    if let Some(raw) = StatusEntryExtractor::ietf().extract(payload) {
        return Ok(Some(vec![normalize_ietf(raw)?]));
    }

    tracing::debug!("credential carries no status claim");
    Ok(None)
}

/// Normalize a single W3C `credentialStatus` object.
pub fn normalize_w3c(raw: &Value) -> Result<StatusListEntry, StatusError> {
    let status: CredentialStatus = serde_json::from_value(raw.clone())
        .map_err(|e| StatusError::InvalidEntry(format!("credentialStatus: {}", e)))?;
    StatusListEntry::try_from(status)
}

/// Normalize an IETF `status` claim: `{"status_list": {"idx": .., "uri": ..}}`.
pub fn normalize_ietf(raw: &Value) -> Result<StatusListEntry, StatusError> {
    let reference = raw
        .get("status_list")
        .ok_or_else(|| StatusError::InvalidEntry("status claim has no status_list".into()))?;
    let reference: TokenStatusReference = serde_json::from_value(reference.clone())
        .map_err(|e| StatusError::InvalidEntry(format!("status_list: {}", e)))?;
    StatusListEntry::try_from(reference)
}
