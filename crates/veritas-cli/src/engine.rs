//! Wires the verification engine from a [`VeritasConfig`].

use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use veritas_core::CancellationHandle;
use veritas_envelope::{decode, FormatDetector};
use veritas_policies::policies::Ed25519KeyVerifier;
use veritas_policies::{PolicyRegistry, PolicyRunner, VerificationInput};
use veritas_status::StatusValidator;

use crate::config::VeritasConfig;
use crate::fetcher::HttpFetcher;

/// Everything a command needs to verify credentials.
pub struct Engine {
    pub runner: PolicyRunner,
    pub validator: StatusValidator,
    pub detector: FormatDetector,
}

impl Engine {
    pub fn from_config(config: &VeritasConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(config.engine.status.fetch_timeout())?;
        let validator = StatusValidator::with_config(fetcher, &config.engine);
        let detector = FormatDetector::new(&config.engine.envelope);

        let verifier = Ed25519KeyVerifier::new();
        for (id, key) in &config.trust.keys {
            verifier
                .add_trusted_key_hex(id.clone(), key)
                .with_context(|| format!("trusted key for {}", id))?;
        }
        tracing::info!(keys = verifier.trusted_key_count(), "loaded trusted keys");

        let registry = PolicyRegistry::with_builtins(validator.clone());
        registry.register_signature_verifier(Arc::new(verifier), detector.clone());

        Ok(Self {
            runner: PolicyRunner::new(Arc::new(registry), &config.engine),
            validator,
            detector,
        })
    }

    /// JSON payload of a credential, decoding its envelope when needed.
    pub fn payload(&self, input: &VerificationInput) -> anyhow::Result<Value> {
        match input {
            VerificationInput::Parsed(value) => Ok(value.clone()),
            VerificationInput::Raw(raw) => Ok(decode(raw, &self.detector)?.payload.to_json()?),
        }
    }
}

/// Read an argument that is either a path to a file or the content itself.
pub fn read_input(arg: &str) -> anyhow::Result<String> {
    let path = Path::new(arg);
    if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    } else {
        Ok(arg.to_string())
    }
}

/// A handle cancelled when the process receives Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationHandle {
    let cancel = CancellationHandle::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling verification");
            handle.cancel();
        }
    });
    cancel
}
