//! Persistent PAN descriptor cache.
//!
//! A channel scan is expensive (tens of seconds of radio dwell time), so
//! the discovered descriptor is persisted and reloaded on later runs. The
//! blob lives at a caller-supplied path; its format is an implementation
//! detail, since any read or parse failure is simply a cache miss that
//! triggers a fresh scan. Writes are whole-file and best-effort: a corrupt
//! or half-written file self-heals on the next run.

use std::path::{Path, PathBuf};

use crate::modem::PanDescriptor;

/// On-disk store for the scan result.
#[derive(Debug, Clone)]
pub struct DescriptorCache {
    path: PathBuf,
}

impl DescriptorCache {
    /// Creates a cache over the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached descriptor, treating every failure as a miss.
    pub async fn load(&self) -> Option<PanDescriptor> {
        let raw = tokio::fs::read(&self.path).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(descriptor) => {
                tracing::debug!("loaded PAN descriptor from {}", self.path.display());
                Some(descriptor)
            }
            Err(e) => {
                tracing::warn!("ignoring corrupt PAN descriptor cache: {e}");
                None
            }
        }
    }

    /// Persists the descriptor. Failures are logged, never fatal; the
    /// worst case is another scan on the next run.
    pub async fn store(&self, descriptor: &PanDescriptor) {
        let blob = match serde_json::to_vec(descriptor) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!("failed to serialize PAN descriptor: {e}");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.path, blob).await {
            tracing::warn!(
                "failed to write PAN descriptor cache {}: {e}",
                self.path.display()
            );
        }
    }
}
