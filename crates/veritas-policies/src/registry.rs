use std::sync::Arc;

use dashmap::DashMap;
use veritas_envelope::FormatDetector;
use veritas_status::StatusValidator;

use crate::policies::{
    AllowedIssuerPolicy, CredentialStatusPolicy, ExpirationPolicy, MaximumCredentialsPolicy,
    MinimumCredentialsPolicy, NotBeforePolicy, RevokedStatusListPolicy, SignaturePolicy,
    SignatureVerifier,
};
use crate::policy::Policy;

/// Policies by name.
#[derive(Default)]
pub struct PolicyRegistry {
    policies: DashMap<String, Arc<dyn Policy>>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in policy that needs no
    /// signature verifier. Status checks go through `validator`.
    pub fn with_builtins(validator: StatusValidator) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(RevokedStatusListPolicy::new(validator.clone())));
        registry.register(Arc::new(CredentialStatusPolicy::new(validator)));
        registry.register(Arc::new(MaximumCredentialsPolicy));
        registry.register(Arc::new(MinimumCredentialsPolicy));
        registry.register(Arc::new(ExpirationPolicy));
        registry.register(Arc::new(NotBeforePolicy));
        registry.register(Arc::new(AllowedIssuerPolicy));
        registry
    }

    /// Register the `signature` policy backed by `verifier`.
    pub fn register_signature_verifier(
        &self,
        verifier: Arc<dyn SignatureVerifier>,
        detector: FormatDetector,
    ) {
        self.register(Arc::new(SignaturePolicy::new(verifier, detector)));
    }

    /// Register a policy, replacing any policy of the same name.
    pub fn register(&self, policy: Arc<dyn Policy>) -> Option<Arc<dyn Policy>> {
        let name = policy.name().to_string();
        tracing::debug!(policy = %name, "registered policy");
        self.policies.insert(name, policy)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Policy>> {
        self.policies.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    /// Registered policy names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.policies.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// `(name, description)` of every registered policy, sorted by name.
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut described: Vec<(String, String)> = self
            .policies
            .iter()
            .map(|e| (e.key().clone(), e.value().description().to_string()))
            .collect();
        described.sort();
        described
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::Ed25519KeyVerifier;
    use veritas_status::StaticFetcher;

    fn validator() -> StatusValidator {
        StatusValidator::new(Arc::new(StaticFetcher::new()), FormatDetector::default())
    }

    #[test]
    fn test_builtins() {
        let registry = PolicyRegistry::with_builtins(validator());
        assert_eq!(
            registry.names(),
            vec![
                "allowed-issuer",
                "credential-status",
                "expired",
                "maximum-credentials",
                "minimum-credentials",
                "not-before",
                "revoked-status-list",
            ]
        );
        assert!(!registry.contains("signature"));
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_register_signature_and_replace() {
        let registry = PolicyRegistry::with_builtins(validator());
        registry.register_signature_verifier(
            Arc::new(Ed25519KeyVerifier::new()),
            FormatDetector::default(),
        );
        assert!(registry.contains("signature"));
        assert_eq!(registry.len(), 8);

        let previous = registry.register(Arc::new(ExpirationPolicy));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 8);
        assert_eq!(registry.describe().len(), 8);
    }
}
