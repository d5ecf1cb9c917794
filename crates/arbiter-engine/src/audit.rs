use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use arbiter_core::{
    AgentVolume, AuditEntry, AuditPage, AuditRecord, AuditStore, Constitution, Decision,
    DecisionStatus, EvaluationRequest, Event, EventBus, MetricsSummary, Result,
};

/// Records decisions, policy changes and emergency-stop events, and answers
/// metrics and audit-log queries.
///
/// Writes never fail the caller: a failed append is logged and published as
/// `Event::AuditWriteFailed`.
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
    bus: EventBus,
    top_agents: usize,
    queue: Mutex<Option<mpsc::UnboundedSender<AuditEntry>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditStore>, bus: EventBus, top_agents: usize) -> Self {
        Self {
            store,
            bus,
            top_agents,
            queue: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    /// Start the background writer used for approved decisions.
    /// Must be called from within a tokio runtime. No-op if already running.
    pub fn start_background_writer(&self) {
        let mut queue = self.queue.lock();
        if queue.is_some() {
            return;
        }
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();
        let store = Arc::clone(&self.store);
        let bus = self.bus.clone();
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(entry) = rx.blocking_recv() {
                append(store.as_ref(), &bus, &entry);
            }
            debug!("audit writer drained");
        });
        *queue = Some(tx);
        *self.writer.lock() = Some(handle);
        info!("background audit writer started");
    }

    /// Stop the background writer after it has drained its queue.
    pub async fn stop_background_writer(&self) {
        // Dropping the sender ends the writer loop once the queue is empty.
        drop(self.queue.lock().take());
        let handle = self.writer.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "audit writer task failed");
            }
        }
    }

    /// Record a governance decision.
    ///
    /// Outcomes other than APPROVED are written before returning. APPROVED
    /// outcomes go through the background writer when it is running.
    pub fn record_decision(&self, request: &EvaluationRequest, decision: &Decision) {
        let entry = AuditEntry::new(AuditRecord::GovernanceDecision {
            agent_id: request.agent_id.clone(),
            command: request.command.clone(),
            target_system: request.target_system.clone(),
            decision: decision.clone(),
        });

        let entry = if decision.status == DecisionStatus::Approved {
            match self.queue.lock().as_ref() {
                Some(tx) => match tx.send(entry) {
                    Ok(()) => return,
                    Err(mpsc::error::SendError(entry)) => entry,
                },
                None => entry,
            }
        } else {
            entry
        };
        self.write(&entry);
    }

    pub fn record_constitution_update(&self, constitution: &Constitution, updated_by: &str, durable: bool) {
        self.write(&AuditEntry::new(AuditRecord::ConstitutionUpdate {
            updated_by: updated_by.to_string(),
            constitution: constitution.clone(),
            durable,
        }));
    }

    pub fn record_emergency_stop(&self, reason: &str, initiated_by: &str) {
        self.write(&AuditEntry::new(AuditRecord::EmergencyStop {
            initiated_by: initiated_by.to_string(),
            reason: reason.to_string(),
            severity: "critical".into(),
        }));
    }

    pub fn record_emergency_resume(&self, resumed_by: &str, reason: &str) {
        self.write(&AuditEntry::new(AuditRecord::EmergencyResume {
            resumed_by: resumed_by.to_string(),
            reason: reason.to_string(),
        }));
    }

    fn write(&self, entry: &AuditEntry) {
        append(self.store.as_ref(), &self.bus, entry);
    }

    /// Decision statistics over the last `window_hours` hours.
    pub fn metrics(
        &self,
        window_hours: u32,
        now: DateTime<Utc>,
        emergency_stop_active: bool,
    ) -> Result<MetricsSummary> {
        let since = now - Duration::hours(i64::from(window_hours));
        let decisions = self.store.decisions_since(since)?;
        Ok(summarize(
            &decisions,
            window_hours,
            self.top_agents,
            emergency_stop_active,
        ))
    }

    /// Newest-first page of the audit log.
    pub fn audit_log(&self, limit: usize, offset: usize) -> Result<AuditPage> {
        self.store.page(limit, offset)
    }
}

fn append(store: &dyn AuditStore, bus: &EventBus, entry: &AuditEntry) {
    if let Err(e) = store.append(entry) {
        error!(kind = %entry.kind(), error = %e, "failed to write audit entry");
        bus.publish(Event::AuditWriteFailed {
            audit_kind: entry.kind().to_string(),
            error: e.to_string(),
        });
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregate governance-decision entries into a metrics summary.
pub fn summarize(
    entries: &[AuditEntry],
    window_hours: u32,
    top_n: usize,
    emergency_stop_active: bool,
) -> MetricsSummary {
    let mut approved = 0u64;
    let mut denied = 0u64;
    let mut pending_approval = 0u64;
    let mut paused = 0u64;
    let mut risk_total = 0u64;
    let mut per_agent: HashMap<&str, u64> = HashMap::new();

    let decisions = entries
        .iter()
        .filter_map(|e| e.record.decision().map(|d| (e.actor(), d)));
    let mut total = 0u64;
    for (agent_id, decision) in decisions {
        total += 1;
        risk_total += u64::from(decision.risk_score);
        *per_agent.entry(agent_id).or_default() += 1;
        match decision.status {
            DecisionStatus::Approved => approved += 1,
            DecisionStatus::Denied => denied += 1,
            DecisionStatus::PendingApproval => pending_approval += 1,
            DecisionStatus::Paused => paused += 1,
        }
    }

    let (approval_rate_percent, average_risk_score) = if total > 0 {
        (
            round2(approved as f64 / total as f64 * 100.0),
            round2(risk_total as f64 / total as f64),
        )
    } else {
        (0.0, 0.0)
    };

    let mut top_agents: Vec<AgentVolume> = per_agent
        .into_iter()
        .map(|(agent_id, count)| AgentVolume {
            agent_id: agent_id.to_string(),
            count,
        })
        .collect();
    top_agents.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.agent_id.cmp(&b.agent_id)));
    top_agents.truncate(top_n);

    MetricsSummary {
        window_hours,
        total_decisions: total,
        approved,
        denied,
        pending_approval,
        paused,
        approval_rate_percent,
        average_risk_score,
        emergency_stop_active,
        top_agents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(agent: &str, decision: Decision) -> AuditEntry {
        AuditEntry::new(AuditRecord::GovernanceDecision {
            agent_id: agent.into(),
            command: "ls".into(),
            target_system: "dev".into(),
            decision,
        })
    }

    #[test]
    fn test_summarize_empty() {
        let m = summarize(&[], 24, 5, false);
        assert_eq!(m.total_decisions, 0);
        assert_eq!(m.approval_rate_percent, 0.0);
        assert_eq!(m.average_risk_score, 0.0);
        assert!(m.top_agents.is_empty());
    }

    #[test]
    fn test_summarize_counts_and_rates() {
        let entries = vec![
            entry("a", Decision::approved("ok", 10, "Execute")),
            entry("a", Decision::approved("ok", 30, "Execute with Monitoring")),
            entry("b", Decision::denied("no", 100, "None")),
            entry(
                "c",
                Decision::escalated(DecisionStatus::PendingApproval, "wait", 60, "Slack/Teams Approval Sent"),
            ),
        ];
        let m = summarize(&entries, 24, 2, true);
        assert_eq!(m.total_decisions, 4);
        assert_eq!(m.approved, 2);
        assert_eq!(m.denied, 1);
        assert_eq!(m.pending_approval, 1);
        assert_eq!(m.paused, 0);
        assert_eq!(m.approval_rate_percent, 50.0);
        assert_eq!(m.average_risk_score, 50.0);
        assert!(m.emergency_stop_active);
        assert_eq!(m.top_agents.len(), 2);
        assert_eq!(m.top_agents[0], AgentVolume { agent_id: "a".into(), count: 2 });
        // Ties broken by agent id.
        assert_eq!(m.top_agents[1].agent_id, "b");
    }
}
