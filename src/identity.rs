//! Service identity: the app identifier a service reports about itself.
//!
//! Identities label synthesized error views and key the timing map. They are
//! fetched at most once per service per run; failed fetches are cached too.
use crate::client::ServiceClient;
use crate::endpoint::ResolvedEndpoint;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Metadata fields probed in order for the service identifier.
pub const IDENTITY_KEYS: &[&str] = &["identifier", "iri", "url", "name"];

/// Identity used when a service does not describe itself.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// First non-empty string among [`IDENTITY_KEYS`].
pub fn identity_from_metadata(metadata: &Value) -> Option<String> {
    IDENTITY_KEYS.iter().find_map(|key| {
        metadata
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Per-run identity cache keyed by service name.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: RefCell<BTreeMap<String, String>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<C: ServiceClient + ?Sized>(
        &self,
        client: &C,
        endpoint: &ResolvedEndpoint,
    ) -> String {
        if let Some(identity) = self.entries.borrow().get(&endpoint.service) {
            return identity.clone();
        }
        let identity = match client.metadata(endpoint) {
            Ok(metadata) => identity_from_metadata(&metadata).unwrap_or_else(|| {
                tracing::warn!(service = %endpoint.service, "metadata names no identifier");
                UNKNOWN_IDENTITY.to_string()
            }),
            Err(err) => {
                tracing::warn!(
                    service = %endpoint.service,
                    error = %err,
                    "could not fetch metadata"
                );
                UNKNOWN_IDENTITY.to_string()
            }
        };
        tracing::debug!(service = %endpoint.service, identity = %identity, "resolved identity");
        self.entries
            .borrow_mut()
            .insert(endpoint.service.clone(), identity.clone());
        identity
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
