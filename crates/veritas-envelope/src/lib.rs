//! Veritas Envelope: Detects whether a raw credential string is a JWT or a
//! hex encoded CWT and recovers its payload.
//!
//! - Format Matcher Chain (`format`)
//! - Content Parser (`parser`)
//! - CBOR claim conversion (`cbor`)
//!
//! Nothing here verifies signatures.

pub mod cbor;
pub mod error;
pub mod format;
pub mod parser;

pub use error::EnvelopeError;
pub use format::{CredentialFormat, FormatDetector, FormatMatcher};
pub use parser::{decode, parse_cwt, parse_jwt, split_jwt, DecodedCredential, JwtParts, Payload};
