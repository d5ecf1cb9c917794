use chrono::{DateTime, Utc};

use crate::audit::{AuditEntry, AuditPage};
use crate::error::Result;
use crate::policy::Constitution;
use crate::types::EmergencyStopState;

/// The persisted active constitution with its last update time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredConstitution {
    pub constitution: Constitution,
    pub updated_at: DateTime<Utc>,
}

/// Document store holding the single active policy and the emergency-stop state.
///
/// Implementations are called from outside the evaluation hot path only.
pub trait PolicyStore: Send + Sync {
    /// The active constitution, or `None` if none was ever saved.
    fn load_active(&self) -> Result<Option<StoredConstitution>>;

    /// Upsert the active constitution.
    fn save_active(&self, constitution: &Constitution, updated_at: DateTime<Utc>) -> Result<()>;

    fn load_emergency_stop(&self) -> Result<Option<EmergencyStopState>>;

    fn save_emergency_stop(&self, state: &EmergencyStopState) -> Result<()>;
}

/// Append-only audit collection.
pub trait AuditStore: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// Governance decisions recorded at or after `since`.
    fn decisions_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditEntry>>;

    /// Newest-first page of all entries, with the total entry count.
    fn page(&self, limit: usize, offset: usize) -> Result<AuditPage>;
}
