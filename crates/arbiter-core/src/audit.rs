use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::policy::Constitution;
use crate::types::{AgentId, Decision};

/// Discriminant of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    GovernanceDecision,
    ConstitutionUpdate,
    EmergencyStop,
    EmergencyResume,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GovernanceDecision => "GOVERNANCE_DECISION",
            Self::ConstitutionUpdate => "CONSTITUTION_UPDATE",
            Self::EmergencyStop => "EMERGENCY_STOP",
            Self::EmergencyResume => "EMERGENCY_RESUME",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GOVERNANCE_DECISION" => Ok(Self::GovernanceDecision),
            "CONSTITUTION_UPDATE" => Ok(Self::ConstitutionUpdate),
            "EMERGENCY_STOP" => Ok(Self::EmergencyStop),
            "EMERGENCY_RESUME" => Ok(Self::EmergencyResume),
            other => Err(format!("unknown audit kind '{other}'")),
        }
    }
}

/// The payload of an audit entry, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditRecord {
    GovernanceDecision {
        agent_id: AgentId,
        command: String,
        target_system: String,
        decision: Decision,
    },
    ConstitutionUpdate {
        updated_by: String,
        constitution: Constitution,
        durable: bool,
    },
    EmergencyStop {
        initiated_by: String,
        reason: String,
        severity: String,
    },
    EmergencyResume {
        resumed_by: String,
        reason: String,
    },
}

impl AuditRecord {
    pub fn kind(&self) -> AuditKind {
        match self {
            Self::GovernanceDecision { .. } => AuditKind::GovernanceDecision,
            Self::ConstitutionUpdate { .. } => AuditKind::ConstitutionUpdate,
            Self::EmergencyStop { .. } => AuditKind::EmergencyStop,
            Self::EmergencyResume { .. } => AuditKind::EmergencyResume,
        }
    }

    /// Who caused the entry: the agent for decisions, the operator otherwise.
    pub fn actor(&self) -> &str {
        match self {
            Self::GovernanceDecision { agent_id, .. } => agent_id,
            Self::ConstitutionUpdate { updated_by, .. } => updated_by,
            Self::EmergencyStop { initiated_by, .. } => initiated_by,
            Self::EmergencyResume { resumed_by, .. } => resumed_by,
        }
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Self::GovernanceDecision { decision, .. } => Some(decision),
            _ => None,
        }
    }
}

/// A single audit log entry with a tamper-evident checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub record: AuditRecord,
    pub checksum: String,
}

impl AuditEntry {
    /// Stamp a record with an id, the current time, and its checksum.
    pub fn new(record: AuditRecord) -> Self {
        Self::at(record, Utc::now())
    }

    pub fn at(record: AuditRecord, timestamp: DateTime<Utc>) -> Self {
        let checksum = checksum(&record, timestamp);
        Self {
            id: Uuid::new_v4(),
            timestamp,
            record,
            checksum,
        }
    }

    pub fn kind(&self) -> AuditKind {
        self.record.kind()
    }

    pub fn actor(&self) -> &str {
        self.record.actor()
    }

    /// Recompute the checksum and compare.
    pub fn verify(&self) -> bool {
        checksum(&self.record, self.timestamp) == self.checksum
    }
}

fn checksum(record: &AuditRecord, timestamp: DateTime<Utc>) -> String {
    let payload = serde_json::to_string(record).unwrap_or_default();
    let input = format!(
        "{}:{}:{}:{}",
        timestamp.to_rfc3339(),
        record.kind(),
        record.actor(),
        payload
    );
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

/// A newest-first page of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentVolume {
    pub agent_id: AgentId,
    pub count: u64,
}

/// Aggregate decision statistics over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub window_hours: u32,
    pub total_decisions: u64,
    pub approved: u64,
    pub denied: u64,
    pub pending_approval: u64,
    pub paused: u64,
    pub approval_rate_percent: f64,
    pub average_risk_score: f64,
    pub emergency_stop_active: bool,
    pub top_agents: Vec<AgentVolume>,
}
