use veritas_core::PolicyError;
use veritas_envelope::EnvelopeError;

/// Errors from the injected fetch capability.
///
/// `Clone` so one failed fetch can be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Http(u16),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

/// Status list resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("fetching {url} failed: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("status list envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("expansion failed: {0}")]
    ExpansionFailure(String),

    #[error("index {index} out of range for {length} byte list with status size {status_size}")]
    IndexOutOfRange {
        index: u64,
        status_size: u8,
        length: usize,
    },

    #[error("invalid status size {0}")]
    InvalidStatusSize(u8),

    #[error("invalid status entry: {0}")]
    InvalidEntry(String),

    #[error("invalid status list: {0}")]
    InvalidStatusList(String),
}

impl From<StatusError> for PolicyError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::FetchFailed { url, source } => PolicyError::FetchFailed {
                url,
                reason: source.to_string(),
            },
            StatusError::Envelope(e) => e.into(),
            StatusError::ExpansionFailure(reason) => PolicyError::ExpansionFailure(reason),
            StatusError::IndexOutOfRange {
                index,
                status_size,
                length,
            } => PolicyError::IndexOutOfRange {
                index,
                status_size,
                length,
            },
            StatusError::InvalidStatusSize(_) | StatusError::InvalidStatusList(_) => {
                PolicyError::InvalidStatusList(err.to_string())
            }
            StatusError::InvalidEntry(reason) => PolicyError::InvalidStatusEntry(reason),
        }
    }
}
