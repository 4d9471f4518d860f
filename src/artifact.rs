//! Downloadable artifacts and their link lifecycle.

use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::registry::{MemoryRegistry, ObjectRegistry, ObjectUrl};

pub const MIME_CSV: &str = "text/csv";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_ZIP: &str = "application/zip";

/// A single downloadable file decoded from a service response.
///
/// Artifacts are created by [`DownloadManager::materialize`] and must be
/// handed back to [`DownloadManager::release`] before being dropped.
#[derive(Debug)]
pub struct DownloadArtifact {
    filename: String,
    mime_type: String,
    label: String,
    payload: Option<Bytes>,
    link: Option<ObjectUrl>,
}

impl DownloadArtifact {
    /// Server-provided filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Human-readable label for the download button.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Decoded bytes, `None` once released.
    #[must_use]
    pub const fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// The link, if one has been created and not revoked.
    #[must_use]
    pub const fn link(&self) -> Option<&ObjectUrl> {
        self.link.as_ref()
    }

    /// Size of the decoded payload in bytes (0 once released).
    #[must_use]
    pub fn size(&self) -> u64 {
        self.payload.as_ref().map_or(0, |p| p.len() as u64)
    }

    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.payload.is_none()
    }
}

/// Artifacts produced by one extraction of one course.
#[derive(Debug)]
#[must_use = "download sets hold links that must be released"]
pub struct DownloadSet {
    /// Course name as reported by the service.
    pub course_name: String,
    /// Number of participants in the roster, when reported.
    pub participant_count: Option<u64>,
    /// Roster CSV followed by the email list.
    pub artifacts: Vec<DownloadArtifact>,
}

impl DownloadSet {
    /// Number of artifacts still holding a live link.
    #[must_use]
    pub fn linked_count(&self) -> usize {
        self.artifacts.iter().filter(|a| a.link.is_some()).count()
    }
}

/// Owns the object registry and every link created through it.
///
/// Links are tracked so that anything still live when the manager is dropped
/// is revoked.
#[derive(Debug)]
pub struct DownloadManager<R: ObjectRegistry = MemoryRegistry> {
    registry: R,
    live: HashSet<ObjectUrl>,
}

impl Default for DownloadManager<MemoryRegistry> {
    fn default() -> Self {
        Self::new(MemoryRegistry::new())
    }
}

impl<R: ObjectRegistry> DownloadManager<R> {
    #[must_use]
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            live: HashSet::new(),
        }
    }

    /// Returns a reference to the underlying registry.
    #[must_use]
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Number of links created by this manager and not yet revoked.
    #[must_use]
    pub fn live_links(&self) -> usize {
        self.live.len()
    }

    /// Decodes a base64 payload into an unlinked artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decoding`] if the payload is not valid base64.
    pub fn materialize(
        &self,
        filename: &str,
        base64_payload: &str,
        mime_type: &str,
        label: &str,
    ) -> Result<DownloadArtifact> {
        let compact: String = base64_payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let decoded = BASE64.decode(compact).map_err(|e| Error::Decoding {
            filename: filename.to_string(),
            reason: e.to_string(),
        })?;
        log::debug!("Decoded {filename} ({} bytes)", decoded.len());
        Ok(DownloadArtifact {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            label: label.to_string(),
            payload: Some(Bytes::from(decoded)),
            link: None,
        })
    }

    /// Returns the artifact's link, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Released`] if the artifact was already released.
    pub fn link(&mut self, artifact: &mut DownloadArtifact) -> Result<ObjectUrl> {
        if let Some(url) = &artifact.link {
            return Ok(url.clone());
        }
        let payload = artifact
            .payload
            .clone()
            .ok_or_else(|| Error::Released(artifact.filename.clone()))?;
        let url = self.registry.create(payload, &artifact.mime_type);
        log::debug!("Linked {} as {url}", artifact.filename);
        self.live.insert(url.clone());
        artifact.link = Some(url.clone());
        Ok(url)
    }

    /// Revokes the artifact's link (if any) and drops its payload.
    pub fn release(&mut self, artifact: &mut DownloadArtifact) {
        if let Some(url) = artifact.link.take() {
            self.registry.revoke(&url);
            self.live.remove(&url);
            log::debug!("Revoked {url} for {}", artifact.filename);
        }
        artifact.payload = None;
    }

    /// Releases every artifact of a set, consuming it.
    pub fn release_set(&mut self, mut set: DownloadSet) {
        for artifact in &mut set.artifacts {
            self.release(artifact);
        }
    }

    /// Releases every artifact of every set.
    pub fn release_all(&mut self, sets: impl IntoIterator<Item = DownloadSet>) {
        for set in sets {
            self.release_set(set);
        }
    }
}

impl<R: ObjectRegistry> Drop for DownloadManager<R> {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            log::debug!("Revoking {} leftover download links", self.live.len());
        }
        for url in self.live.drain() {
            self.registry.revoke(&url);
        }
    }
}
