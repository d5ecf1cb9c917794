use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

use arbiter_core::{Constitution, PolicyStore, Result};

/// The constitution currently in force, with the time it took effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePolicy {
    pub constitution: Constitution,
    pub updated_at: DateTime<Utc>,
}

/// Holds the active constitution and mediates its persistence.
///
/// Readers take an `Arc` snapshot and never hold the lock while evaluating;
/// writers build a new `ActivePolicy` and swap the pointer.
pub struct ConstitutionStore {
    store: Arc<dyn PolicyStore>,
    active: RwLock<Option<Arc<ActivePolicy>>>,
    durable: AtomicBool,
}

impl ConstitutionStore {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self {
            store,
            active: RwLock::new(None),
            durable: AtomicBool::new(false),
        }
    }

    /// Load the persisted policy and make it active.
    ///
    /// Never fails: a missing, unreadable or invalid stored policy is replaced by
    /// the built-in defaults. A missing one is also seeded into the store.
    pub fn load(&self, now: DateTime<Utc>) -> Arc<ActivePolicy> {
        let active = match self.store.load_active() {
            Ok(Some(stored)) => match stored.constitution.validate() {
                Ok(()) => {
                    info!(updated_at = %stored.updated_at, "loaded constitution from store");
                    self.durable.store(true, Ordering::SeqCst);
                    ActivePolicy {
                        constitution: stored.constitution,
                        updated_at: stored.updated_at,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stored constitution is invalid, using defaults");
                    self.durable.store(false, Ordering::SeqCst);
                    ActivePolicy {
                        constitution: Constitution::default(),
                        updated_at: now,
                    }
                }
            },
            Ok(None) => {
                info!("no stored constitution, seeding defaults");
                let constitution = Constitution::default();
                if self.save(&constitution, now).is_err() {
                    warn!("default constitution is active but not persisted");
                }
                ActivePolicy {
                    constitution,
                    updated_at: now,
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to load constitution, using defaults");
                self.durable.store(false, Ordering::SeqCst);
                ActivePolicy {
                    constitution: Constitution::default(),
                    updated_at: now,
                }
            }
        };

        let active = Arc::new(active);
        *self.active.write() = Some(Arc::clone(&active));
        active
    }

    /// Persist `constitution` as the active policy.
    ///
    /// Failure is logged and marks the policy non-durable; the in-memory
    /// active copy is left as is.
    pub fn save(&self, constitution: &Constitution, updated_at: DateTime<Utc>) -> Result<()> {
        match self.store.save_active(constitution, updated_at) {
            Ok(()) => {
                self.durable.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to save constitution");
                self.durable.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Swap in a new active policy. The caller validates first.
    pub fn replace(&self, constitution: Constitution, updated_at: DateTime<Utc>) -> Arc<ActivePolicy> {
        let active = Arc::new(ActivePolicy {
            constitution,
            updated_at,
        });
        *self.active.write() = Some(Arc::clone(&active));
        active
    }

    /// The active policy, or `None` before `load`.
    pub fn snapshot(&self) -> Option<Arc<ActivePolicy>> {
        self.active.read().clone()
    }

    /// Whether the active policy is known to be persisted.
    pub fn is_durable(&self) -> bool {
        self.durable.load(Ordering::SeqCst)
    }
}
