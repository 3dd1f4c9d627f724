//! crates/leafscan_core/src/preview.rs
//!
//! Ephemeral in-memory preview URLs for candidate images.
//!
//! A [`PreviewHandle`] is the only way to register bytes in the store and it
//! revokes its entry when dropped, so a handle cannot outlive its owner.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:";

#[derive(Clone)]
struct PreviewEntry {
    mime_type: String,
    bytes: Bytes,
}

/// Shared registry of live previews.
#[derive(Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<Uuid, PreviewEntry>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers bytes and returns the handle that keeps them alive.
    pub fn create(&self, mime_type: &str, bytes: Bytes) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.lock().insert(
            id,
            PreviewEntry {
                mime_type: mime_type.to_string(),
                bytes,
            },
        );
        debug!(preview_id = %id, "Preview handle created");
        PreviewHandle {
            id,
            store: self.clone(),
        }
    }

    /// Resolves a live preview by id or by its `blob:` URL.
    pub fn resolve(&self, id_or_url: &str) -> Option<(String, Bytes)> {
        let raw = id_or_url.strip_prefix(URL_PREFIX).unwrap_or(id_or_url);
        let id = Uuid::parse_str(raw).ok()?;
        self.lock()
            .get(&id)
            .map(|entry| (entry.mime_type.clone(), entry.bytes.clone()))
    }

    /// Number of handles that have not been released yet.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn revoke(&self, id: &Uuid) {
        if self.lock().remove(id).is_some() {
            debug!(preview_id = %id, "Preview handle revoked");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, PreviewEntry>> {
        // A panic while holding the lock cannot leave a half-written map entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A live preview URL. Dropping it revokes the URL.
pub struct PreviewHandle {
    id: Uuid,
    store: PreviewStore,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> String {
        format!("{}{}", URL_PREFIX, self.id)
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.url()).finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.revoke(&self.id);
    }
}
