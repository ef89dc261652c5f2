//! Veritas Policies: The policy framework and its runner.
//!
//! - [`Policy`] trait and [`PolicyContext`]
//! - Built-in policies (`policies`): credential status, credential count
//!   limits, validity dates, allowed issuers, signatures
//! - [`PolicyRegistry`] resolving request names to policies
//! - [`PolicyRunner`] executing requests concurrently, with cancellation,
//!   for single credentials and for presentations

pub mod policies;
pub mod policy;
pub mod registry;
pub mod runner;
pub mod verification;

pub use policy::{InputKind, Policy, PolicyContext};
pub use registry::PolicyRegistry;
pub use runner::{PolicyRunner, VerificationInput, FORMAT_CONTEXT_KEY};
pub use verification::{credential_type, PresentationRequest};
