//! Veritas Core: Policy requests, results, errors and engine configuration
//! shared by every crate of the Veritas verification engine.

pub mod cancel;
pub mod config;
pub mod error;
pub mod policy;
pub mod result;

pub use cancel::CancellationHandle;
pub use config::{EngineConfig, EnvelopeConfig, RunnerConfig, StatusConfig};
pub use error::PolicyError;
pub use policy::{parse_policy_requests, PolicyRequest};
pub use result::{
    PolicyOutcome, PolicyResult, PolicyValue, PresentationResultEntry,
    PresentationVerificationResponse, StatusCheck,
};
