use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// Engine-wide policy errors.
///
/// Every variant except [`PolicyError::Other`] is a recognised, structured
/// error and serializes as a JSON object carrying its kind, its display
/// message and its detail fields. `Other` is the generic fallback and
/// serializes as its message string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("unsupported credential format")]
    UnsupportedFormat,

    #[error("malformed JWT: {0}")]
    MalformedJwt(String),

    #[error("malformed CWT: {0}")]
    MalformedCwt(String),

    #[error("status list fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("status list expansion failed: {0}")]
    ExpansionFailure(String),

    #[error("status index {index} out of range (status size {status_size}, list length {length} bytes)")]
    IndexOutOfRange {
        index: u64,
        status_size: u8,
        length: usize,
    },

    #[error("invalid status entry: {0}")]
    InvalidStatusEntry(String),

    #[error("invalid status list: {0}")]
    InvalidStatusList(String),

    #[error("status validation failed: expected {expected}, but got {actual}")]
    StatusMismatch { expected: u64, actual: u64 },

    #[error("credential status {purpose} is asserted (value {value})")]
    StatusAsserted { purpose: String, value: u64 },

    #[error("no status entry found for purpose {0}")]
    PurposeMismatch(String),

    #[error("presentation holds {total} credentials, {exceeded} over the limit")]
    MaximumCredentialsExceeded { total: usize, exceeded: usize },

    #[error("presentation holds {total} credentials, {missing} short of the minimum")]
    MinimumCredentialsNotMet { total: usize, missing: usize },

    #[error("credential expired at {date}")]
    Expired { date: String, expired_since_secs: i64 },

    #[error("credential not valid before {date}")]
    NotYetValid { date: String, available_in_secs: i64 },

    #[error("issuer {issuer} is not in the allowed issuer list")]
    UntrustedIssuer {
        issuer: String,
        allowed: Vec<String>,
    },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid arguments for policy {policy}: {reason}")]
    InvalidArguments { policy: String, reason: String },

    #[error("unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("policy {policy} cannot be applied to {found}")]
    UnsupportedInput { policy: String, found: String },

    #[error("verification cancelled before the policy completed")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl PolicyError {
    /// Stable kind name used as the `error` field of the structured form.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::MalformedJwt(_) => "MalformedJwt",
            Self::MalformedCwt(_) => "MalformedCwt",
            Self::FetchFailed { .. } => "FetchFailed",
            Self::ExpansionFailure(_) => "ExpansionFailure",
            Self::IndexOutOfRange { .. } => "IndexOutOfRange",
            Self::InvalidStatusEntry(_) => "InvalidStatusEntry",
            Self::InvalidStatusList(_) => "InvalidStatusList",
            Self::StatusMismatch { .. } => "StatusMismatch",
            Self::StatusAsserted { .. } => "StatusAsserted",
            Self::PurposeMismatch(_) => "PurposeMismatch",
            Self::MaximumCredentialsExceeded { .. } => "MaximumCredentialsExceeded",
            Self::MinimumCredentialsNotMet { .. } => "MinimumCredentialsNotMet",
            Self::Expired { .. } => "Expired",
            Self::NotYetValid { .. } => "NotYetValid",
            Self::UntrustedIssuer { .. } => "UntrustedIssuer",
            Self::InvalidSignature(_) => "InvalidSignature",
            Self::InvalidArguments { .. } => "InvalidArguments",
            Self::UnknownPolicy(_) => "UnknownPolicy",
            Self::UnsupportedInput { .. } => "UnsupportedInput",
            Self::Cancelled => "Cancelled",
            Self::Other(_) => "Other",
        }
    }

    /// Whether a retry of the whole verification could change the outcome.
    ///
    /// Remote fetch failures and cancellation are transient. Every other
    /// error follows from the credential or the request and repeats.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FetchFailed { .. } | Self::Cancelled)
    }

    /// JSON form of the error.
    pub fn to_json(&self) -> Value {
        let details = match self {
            Self::Other(message) => return Value::String(message.clone()),
            Self::FetchFailed { url, reason } => json!({ "url": url, "reason": reason }),
            Self::IndexOutOfRange {
                index,
                status_size,
                length,
            } => json!({ "index": index, "status_size": status_size, "length": length }),
            Self::StatusMismatch { expected, actual } => {
                json!({ "expected": expected, "actual": actual })
            }
            Self::StatusAsserted { purpose, value } => {
                json!({ "purpose": purpose, "value": value })
            }
            Self::PurposeMismatch(purpose) => json!({ "purpose": purpose }),
            Self::MaximumCredentialsExceeded { total, exceeded } => {
                json!({ "total": total, "exceeded": exceeded })
            }
            Self::MinimumCredentialsNotMet { total, missing } => {
                json!({ "total": total, "missing": missing })
            }
            Self::Expired {
                date,
                expired_since_secs,
            } => json!({ "date": date, "expired_since_seconds": expired_since_secs }),
            Self::NotYetValid {
                date,
                available_in_secs,
            } => json!({ "date": date, "available_in_seconds": available_in_secs }),
            Self::UntrustedIssuer { issuer, allowed } => {
                json!({ "issuer": issuer, "allowed_issuers": allowed })
            }
            Self::InvalidArguments { policy, .. } | Self::UnsupportedInput { policy, .. } => {
                json!({ "policy": policy })
            }
            Self::UnknownPolicy(name) => json!({ "policy": name }),
            _ => json!({}),
        };

        let mut object = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let (Value::Object(target), Value::Object(extra)) = (&mut object, details) {
            target.extend(extra);
        }
        object
    }
}

impl Serialize for PolicyError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
