use veritas_core::PolicyError;

/// Envelope detection and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("input matches no supported credential format")]
    UnsupportedFormat,

    #[error("malformed JWT: {0}")]
    MalformedJwt(String),

    #[error("malformed CWT: {0}")]
    MalformedCwt(String),
}

impl From<EnvelopeError> for PolicyError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::UnsupportedFormat => PolicyError::UnsupportedFormat,
            EnvelopeError::MalformedJwt(reason) => PolicyError::MalformedJwt(reason),
            EnvelopeError::MalformedCwt(reason) => PolicyError::MalformedCwt(reason),
        }
    }
}
