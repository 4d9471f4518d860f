//! Short-lived object registry backing download links.
//!
//! A registry hands out an [`ObjectUrl`] for a binary payload and keeps the
//! payload reachable until the URL is revoked. Every URL must be revoked
//! exactly once; the registry reports how many are still live so leaks are
//! observable.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

/// Opaque link to a registered payload, e.g. `blob:roster-dl/5f0c…`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    /// Returns the link as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of revocable object URLs.
pub trait ObjectRegistry {
    /// Registers a payload and returns a fresh URL for it.
    fn create(&mut self, payload: Bytes, mime_type: &str) -> ObjectUrl;

    /// Revokes a URL. Revoking an unknown or already revoked URL is a no-op.
    fn revoke(&mut self, url: &ObjectUrl);

    /// Number of URLs created and not yet revoked.
    fn live_count(&self) -> usize;
}

/// A registered payload.
#[derive(Debug, Clone)]
pub struct RegisteredObject {
    /// MIME type given at registration.
    pub mime_type: String,
    /// Registered bytes.
    pub payload: Bytes,
}

/// In-process registry that keeps payloads in memory until revoked.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    objects: HashMap<ObjectUrl, RegisteredObject>,
    created: usize,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a live URL to its payload.
    #[must_use]
    pub fn resolve(&self, url: &ObjectUrl) -> Option<&RegisteredObject> {
        self.objects.get(url)
    }

    /// Total number of URLs ever created by this registry.
    #[must_use]
    pub const fn created_count(&self) -> usize {
        self.created
    }
}

impl ObjectRegistry for MemoryRegistry {
    fn create(&mut self, payload: Bytes, mime_type: &str) -> ObjectUrl {
        let url = ObjectUrl(format!("blob:roster-dl/{}", uuid::Uuid::new_v4()));
        self.objects.insert(
            url.clone(),
            RegisteredObject {
                mime_type: mime_type.to_string(),
                payload,
            },
        );
        self.created += 1;
        url
    }

    fn revoke(&mut self, url: &ObjectUrl) {
        if self.objects.remove(url).is_none() {
            log::debug!("Revoke of unknown object URL {url}");
        }
    }

    fn live_count(&self) -> usize {
        self.objects.len()
    }
}
