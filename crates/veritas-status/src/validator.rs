//! Status validation: one entry in, one status value out.
//!
//! Fetching is the only suspension point; everything after the body
//! arrives is pure CPU work.

use std::sync::Arc;

use veritas_core::{EngineConfig, StatusCheck};
use veritas_envelope::FormatDetector;

use crate::content::{read_status_list, StatusListContent};
use crate::entry::StatusListEntry;
use crate::error::StatusError;
use crate::fetch::{SingleFlightFetcher, StatusListFetcher};

/// Resolves status list entries against their remote lists.
#[derive(Clone)]
pub struct StatusValidator {
    fetcher: Arc<dyn StatusListFetcher>,
    detector: FormatDetector,
}

impl StatusValidator {
    pub fn new(fetcher: Arc<dyn StatusListFetcher>, detector: FormatDetector) -> Self {
        Self { fetcher, detector }
    }

    /// Wrap `fetcher` in a [`SingleFlightFetcher`] using the configured TTL.
    pub fn with_config<F: StatusListFetcher + 'static>(fetcher: F, config: &EngineConfig) -> Self {
        let cached = SingleFlightFetcher::new(fetcher, config.status.cache_ttl());
        Self::new(Arc::new(cached), FormatDetector::new(&config.envelope))
    }

    pub fn fetcher(&self) -> &Arc<dyn StatusListFetcher> {
        &self.fetcher
    }

    /// Fetch the list referenced by `entry` and read its status value.
    pub async fn check(&self, entry: &StatusListEntry) -> Result<StatusCheck, StatusError> {
        let url = &entry.status_list_credential;
        let body = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|source| StatusError::FetchFailed {
                url: url.clone(),
                source,
            })?;

        let content = read_status_list(&body, &self.detector)?;
        ensure_compatible(entry, &content)?;

        let expanded = content.expand(entry.status_size)?;
        let value = expanded.read(entry.status_list_index)?;

        tracing::debug!(
            url = %url,
            index = entry.status_list_index,
            value = value,
            "read status value"
        );

        Ok(StatusCheck {
            status_type: entry.list_type.to_string(),
            purpose: entry.status_purpose.clone(),
            index: entry.status_list_index,
            status_size: expanded.status_size,
            value,
            status_list_credential: url.clone(),
        })
    }
}

/// The fetched list must belong to the entry's family and serve its purpose.
fn ensure_compatible(entry: &StatusListEntry, content: &StatusListContent) -> Result<(), StatusError> {
    if entry.list_type.is_w3c() != content.list_type().is_w3c() {
        return Err(StatusError::InvalidStatusList(format!(
            "entry of type {} references a {} list",
            entry.list_type,
            content.list_type()
        )));
    }
    if let Some(purpose) = &entry.status_purpose {
        if !content.supports_purpose(purpose) {
            return Err(StatusError::InvalidStatusList(format!(
                "list does not serve status purpose {}",
                purpose
            )));
        }
    }
    Ok(())
}
