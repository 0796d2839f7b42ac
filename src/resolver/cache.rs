//! Project resolution cache
//!
//! Memoizes credential-to-project lookups for the lifetime of the process.
//! Keys are written once and never evicted; a process restart is the only
//! way to pick up a key that moved to another project.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::proxy::credentials::fingerprint;
use crate::resolver::ResolveProject;

/// Placeholder error for `get_or_try_init`; failed resolutions are not
/// cached, so this never leaves the module.
struct ResolutionFailed;

/// In-memory, process-lifetime cache of credential to project id.
///
/// Each credential owns a `OnceCell` slot, so concurrent lookups for the
/// same uncached credential await a single resolver probe instead of racing
/// duplicate ones. A failed probe leaves the slot empty and a later request
/// retries.
pub struct ProjectCache {
    resolver: Arc<dyn ResolveProject>,
    slots: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl ProjectCache {
    /// Create a new cache backed by the given resolver
    pub fn new(resolver: Arc<dyn ResolveProject>) -> Self {
        Self {
            resolver,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a cached project id without resolving
    pub fn get(&self, credential: &str) -> Option<String> {
        let slots = self.slots.lock().unwrap();
        slots.get(credential).and_then(|slot| slot.get().cloned())
    }

    /// Record a resolved project id; the first write for a credential wins
    pub fn put(&self, credential: &str, project_id: &str) {
        let slot = self.slot(credential);
        // set() on an already initialized slot is rejected, keeping the
        // earlier value
        let _ = slot.set(project_id.to_string());
    }

    /// Number of credentials with a resolved project
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap();
        slots.values().filter(|slot| slot.initialized()).count()
    }

    /// True when no credential has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the project id for a credential, resolving it on a miss.
    ///
    /// Concurrent calls for the same uncached credential share one probe.
    /// A probe that resolves nothing is not cached.
    #[instrument(skip_all, fields(key = %fingerprint(credential)))]
    pub async fn get_or_resolve(&self, credential: &str) -> Option<String> {
        let slot = self.slot(credential);

        if let Some(project_id) = slot.get() {
            debug!(project = %project_id, "Project cache hit");
            return Some(project_id.clone());
        }

        debug!("Project cache miss, resolving against upstream");

        slot.get_or_try_init(|| async {
            self.resolver
                .resolve(credential)
                .await
                .ok_or(ResolutionFailed)
        })
        .await
        .ok()
        .cloned()
    }

    /// Fetch or create the slot for a credential. The map lock is only held
    /// for the lookup, never across an await.
    fn slot(&self, credential: &str) -> Arc<OnceCell<String>> {
        let mut slots = self.slots.lock().unwrap();
        slots.entry(credential.to_string()).or_default().clone()
    }
}
