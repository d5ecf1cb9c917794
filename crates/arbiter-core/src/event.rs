use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::{AgentId, DecisionStatus};

/// Events flowing out of the engine to operators and integrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    // ── Decisions ──────────────────────────────────────────────
    DecisionMade {
        agent_id: AgentId,
        status: DecisionStatus,
        risk_score: u8,
    },
    /// A decision needs a human; notification channels pick this up.
    ApprovalRequested {
        approval_id: Uuid,
        agent_id: AgentId,
        command: String,
        target_system: String,
        status: DecisionStatus,
        risk_score: u8,
        reason: String,
    },

    // ── Policy lifecycle ───────────────────────────────────────
    ConstitutionUpdated {
        updated_by: String,
        durable: bool,
    },
    PolicyNotDurable {
        error: String,
    },

    // ── Emergency stop ─────────────────────────────────────────
    EmergencyStopActivated {
        reason: String,
        initiated_by: String,
        timestamp: DateTime<Utc>,
    },
    EmergencyStopCleared {
        resumed_by: String,
        timestamp: DateTime<Utc>,
    },

    // ── Operations ─────────────────────────────────────────────
    AuditWriteFailed {
        audit_kind: String,
        error: String,
    },
    Shutdown,
}

/// A broadcast-based event bus for system-wide pub/sub.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<Event>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish without waiting; dropped when nobody is subscribed.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(4096)
    }
}
