//! Built-in policies.

pub mod issuer;
pub mod presentation;
pub mod signature;
pub mod status;
pub mod validity;

pub use issuer::AllowedIssuerPolicy;
pub use presentation::{MaximumCredentialsPolicy, MinimumCredentialsPolicy};
pub use signature::{Ed25519KeyVerifier, SignaturePolicy, SignatureVerifier};
pub use status::{CredentialStatusPolicy, RevokedStatusListPolicy, StatusPolicyArgs};
pub use validity::{ExpirationPolicy, NotBeforePolicy};
