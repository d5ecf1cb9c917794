use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::policy::Constitution;

/// Identifier of the agent proposing an action.
pub type AgentId = String;

/// Identifier correlating a paused or pending decision with the human approval workflow.
pub type ApprovalId = Uuid;

// ── Evaluation request ─────────────────────────────────────────

/// A proposed action submitted by an agent for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    #[serde(alias = "agentId")]
    pub agent_id: AgentId,
    /// Arbitrary command text the agent wants to run.
    pub command: String,
    /// Target system; the environment is inferred from substrings of it.
    #[serde(alias = "targetSystem")]
    pub target_system: String,
    /// Optional free-form context (may carry `agentReputation` in `[0, 1]`).
    #[serde(default)]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

impl EvaluationRequest {
    pub fn new(
        agent_id: impl Into<String>,
        command: impl Into<String>,
        target_system: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            command: command.into(),
            target_system: target_system.into(),
            context: None,
        }
    }

    /// Attach a context value.
    pub fn with_context(mut self, key: &str, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.to_string(), value);
        self
    }

    /// The agent's reputation from context, if present and numeric.
    pub fn reputation(&self) -> Option<f64> {
        let context = self.context.as_ref()?;
        context
            .get("agentReputation")
            .or_else(|| context.get("agent_reputation"))
            .and_then(|v| v.as_f64())
    }

    /// Environment inferred from the target system, if any.
    pub fn environment(&self) -> Option<Environment> {
        Environment::infer(&self.target_system)
    }
}

// ── Environment ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
}

impl Environment {
    /// Infer from a target system name: "prod", then "stage", then "dev".
    pub fn infer(target_system: &str) -> Option<Self> {
        let target = target_system.to_lowercase();
        if target.contains("prod") {
            Some(Self::Production)
        } else if target.contains("stage") {
            Some(Self::Staging)
        } else if target.contains("dev") {
            Some(Self::Development)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

// ── Risk level ─────────────────────────────────────────────────

/// Classification of a risk score against the approval thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Auto-approve.
    Low,
    /// Approve and monitor.
    Medium,
    /// Requires human approval.
    High,
    /// Auto-block.
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        })
    }
}

// ── Decision ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Denied,
    Paused,
    PendingApproval,
    Approved,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Denied => "DENIED",
            Self::Paused => "PAUSED",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
        }
    }

    /// Whether this outcome waits on a human.
    pub fn needs_human(&self) -> bool {
        matches!(self, Self::Paused | Self::PendingApproval)
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DENIED" => Ok(Self::Denied),
            "PAUSED" => Ok(Self::Paused),
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "APPROVED" => Ok(Self::Approved),
            other => Err(format!("unknown decision status '{other}'")),
        }
    }
}

/// The authoritative outcome of evaluating a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub status: DecisionStatus,
    pub reason: String,
    /// Always within 0-100.
    pub risk_score: u8,
    pub action_required: String,
    /// Present only for PAUSED and PENDING_APPROVAL.
    pub approval_id: Option<ApprovalId>,
}

impl Decision {
    pub fn denied(reason: impl Into<String>, risk_score: u8, action_required: &str) -> Self {
        Self {
            status: DecisionStatus::Denied,
            reason: reason.into(),
            risk_score: risk_score.min(100),
            action_required: action_required.to_string(),
            approval_id: None,
        }
    }

    pub fn approved(reason: impl Into<String>, risk_score: u8, action_required: &str) -> Self {
        Self {
            status: DecisionStatus::Approved,
            reason: reason.into(),
            risk_score: risk_score.min(100),
            action_required: action_required.to_string(),
            approval_id: None,
        }
    }

    /// A decision that waits on a human; a fresh approval id is generated.
    pub fn escalated(
        status: DecisionStatus,
        reason: impl Into<String>,
        risk_score: u8,
        action_required: &str,
    ) -> Self {
        debug_assert!(status.needs_human());
        Self {
            status,
            reason: reason.into(),
            risk_score: risk_score.min(100),
            action_required: action_required.to_string(),
            approval_id: Some(Uuid::new_v4()),
        }
    }
}

// ── Emergency stop ─────────────────────────────────────────────

/// Kill-switch state plus the metadata of its last transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyStopState {
    pub active: bool,
    pub reason: String,
    pub initiated_by: String,
    pub activated_at: DateTime<Utc>,
    #[serde(default)]
    pub resumed_by: Option<String>,
    #[serde(default)]
    pub resumed_at: Option<DateTime<Utc>>,
}

// ── Engine views ───────────────────────────────────────────────

/// What `get_constitution` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstitutionView {
    pub constitution: Constitution,
    pub emergency_stop_active: bool,
    pub last_updated: DateTime<Utc>,
    /// False when the active policy could not be persisted.
    pub durable: bool,
}

/// Result of a successful constitution update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub durable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Uninitialized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub emergency_stop_active: bool,
    pub constitution_loaded: bool,
    pub policy_durable: bool,
}
