use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use arbiter_core::{
    AuditEntry, AuditKind, AuditPage, AuditStore, Constitution, EmergencyStopState, PolicyStore,
    Result, StoredConstitution,
};

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    active: RwLock<Option<StoredConstitution>>,
    emergency: RwLock<Option<EmergencyStopState>>,
    audit: RwLock<Vec<AuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of audit entries held.
    pub fn audit_len(&self) -> usize {
        self.audit.read().len()
    }
}

impl PolicyStore for MemoryStore {
    fn load_active(&self) -> Result<Option<StoredConstitution>> {
        Ok(self.active.read().clone())
    }

    fn save_active(&self, constitution: &Constitution, updated_at: DateTime<Utc>) -> Result<()> {
        *self.active.write() = Some(StoredConstitution {
            constitution: constitution.clone(),
            updated_at,
        });
        Ok(())
    }

    fn load_emergency_stop(&self) -> Result<Option<EmergencyStopState>> {
        Ok(self.emergency.read().clone())
    }

    fn save_emergency_stop(&self, state: &EmergencyStopState) -> Result<()> {
        *self.emergency.write() = Some(state.clone());
        Ok(())
    }
}

impl AuditStore for MemoryStore {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.audit.write().push(entry.clone());
        Ok(())
    }

    fn decisions_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .audit
            .read()
            .iter()
            .filter(|e| e.kind() == AuditKind::GovernanceDecision && e.timestamp >= since)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    fn page(&self, limit: usize, offset: usize) -> Result<AuditPage> {
        let audit = self.audit.read();
        // Newest first; equal timestamps fall back to reverse insertion order.
        let mut ordered: Vec<(usize, &AuditEntry)> = audit.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
        let entries = ordered
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect();
        Ok(AuditPage {
            entries,
            total: audit.len() as u64,
            limit,
            offset,
        })
    }
}
