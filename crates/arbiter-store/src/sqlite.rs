use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;
use uuid::Uuid;

use arbiter_core::{
    ArbiterError, AuditEntry, AuditKind, AuditPage, AuditRecord, AuditStore, Constitution,
    EmergencyStopState, PolicyStore, Result, StoredConstitution,
};

const ACTIVE_KEY: &str = "active";

/// SQLite-backed policy and audit store.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

fn store_err(e: rusqlite::Error) -> ArbiterError {
    ArbiterError::Store(e.to_string())
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ArbiterError::Store(format!("bad timestamp '{raw}': {e}")))
}

impl SqliteStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        info!(?path, "opening arbiter store");

        let conn = Connection::open(path).map_err(store_err)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(store_err)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS constitutions (
                key TEXT PRIMARY KEY,
                rules TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS emergency_stop (
                key TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entry_id TEXT NOT NULL UNIQUE,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                actor TEXT NOT NULL,
                agent_id TEXT,
                status TEXT,
                risk_score INTEGER,
                payload TEXT NOT NULL,
                checksum TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_kind ON audit_log(kind, timestamp);
            ",
        )
        .map_err(store_err)?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    fn row_to_entry(
        entry_id: String,
        timestamp: String,
        payload: String,
        checksum: String,
    ) -> Result<AuditEntry> {
        let id = Uuid::parse_str(&entry_id)
            .map_err(|e| ArbiterError::Store(format!("bad entry id '{entry_id}': {e}")))?;
        let record: AuditRecord = serde_json::from_str(&payload)?;
        Ok(AuditEntry {
            id,
            timestamp: decode_ts(&timestamp)?,
            record,
            checksum,
        })
    }

    fn query_entries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<AuditEntry>> {
        let db = self.db.lock();
        let mut stmt = db.prepare(sql).map_err(store_err)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(store_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (entry_id, timestamp, payload, checksum) = row.map_err(store_err)?;
            entries.push(Self::row_to_entry(entry_id, timestamp, payload, checksum)?);
        }
        Ok(entries)
    }
}

impl PolicyStore for SqliteStore {
    fn load_active(&self) -> Result<Option<StoredConstitution>> {
        let db = self.db.lock();
        let row = db
            .query_row(
                "SELECT rules, updated_at FROM constitutions WHERE key = ?1",
                rusqlite::params![ACTIVE_KEY],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(store_err)?;

        match row {
            Some((rules, updated_at)) => Ok(Some(StoredConstitution {
                constitution: serde_json::from_str::<Constitution>(&rules)?,
                updated_at: decode_ts(&updated_at)?,
            })),
            None => Ok(None),
        }
    }

    fn save_active(&self, constitution: &Constitution, updated_at: DateTime<Utc>) -> Result<()> {
        let rules = serde_json::to_string(constitution)?;
        let db = self.db.lock();
        db.execute(
            "INSERT INTO constitutions (key, rules, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET rules = excluded.rules, updated_at = excluded.updated_at",
            rusqlite::params![ACTIVE_KEY, rules, encode_ts(updated_at)],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn load_emergency_stop(&self) -> Result<Option<EmergencyStopState>> {
        let db = self.db.lock();
        let state = db
            .query_row(
                "SELECT state FROM emergency_stop WHERE key = ?1",
                rusqlite::params![ACTIVE_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(store_err)?;

        state
            .map(|raw| serde_json::from_str::<EmergencyStopState>(&raw).map_err(Into::into))
            .transpose()
    }

    fn save_emergency_stop(&self, state: &EmergencyStopState) -> Result<()> {
        let raw = serde_json::to_string(state)?;
        let db = self.db.lock();
        db.execute(
            "INSERT INTO emergency_stop (key, state, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
            rusqlite::params![ACTIVE_KEY, raw, encode_ts(Utc::now())],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

impl AuditStore for SqliteStore {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.record)?;
        let (agent_id, status, risk_score) = match &entry.record {
            AuditRecord::GovernanceDecision {
                agent_id, decision, ..
            } => (
                Some(agent_id.as_str()),
                Some(decision.status.as_str()),
                Some(decision.risk_score as i64),
            ),
            _ => (None, None, None),
        };

        let db = self.db.lock();
        db.execute(
            "INSERT INTO audit_log (entry_id, timestamp, kind, actor, agent_id, status, risk_score, payload, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                entry.id.to_string(),
                encode_ts(entry.timestamp),
                entry.kind().as_str(),
                entry.actor(),
                agent_id,
                status,
                risk_score,
                payload,
                entry.checksum,
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn decisions_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditEntry>> {
        self.query_entries(
            "SELECT entry_id, timestamp, payload, checksum FROM audit_log
             WHERE kind = ?1 AND timestamp >= ?2 ORDER BY timestamp ASC, id ASC",
            rusqlite::params![AuditKind::GovernanceDecision.as_str(), encode_ts(since)],
        )
    }

    fn page(&self, limit: usize, offset: usize) -> Result<AuditPage> {
        let entries = self.query_entries(
            "SELECT entry_id, timestamp, payload, checksum FROM audit_log
             ORDER BY timestamp DESC, id DESC LIMIT ?1 OFFSET ?2",
            rusqlite::params![limit as i64, offset as i64],
        )?;
        let total = {
            let db = self.db.lock();
            db.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get::<_, i64>(0))
                .map_err(store_err)?
        };
        Ok(AuditPage {
            entries,
            total: total.max(0) as u64,
            limit,
            offset,
        })
    }
}
