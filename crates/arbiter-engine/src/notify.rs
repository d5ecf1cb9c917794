use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use arbiter_core::{AgentId, DecisionStatus, Event, EventBus, Result};

/// What a human approver is told about an escalated decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalTicket {
    pub approval_id: Uuid,
    pub agent_id: AgentId,
    pub command: String,
    pub target_system: String,
    pub status: DecisionStatus,
    pub risk_score: u8,
    pub reason: String,
    /// Channel labels the ticket is addressed to.
    pub channels: Vec<String>,
}

/// An outbound escalation channel (chat, paging, ticketing, …).
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, ticket: &ApprovalTicket) -> Result<()>;
}

/// Writes tickets to the log. Always registered by the CLI.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn notify(&self, ticket: &ApprovalTicket) -> Result<()> {
        info!(
            approval_id = %ticket.approval_id,
            agent_id = %ticket.agent_id,
            target = %ticket.target_system,
            status = %ticket.status,
            risk_score = ticket.risk_score,
            channels = ?ticket.channels,
            "approval requested"
        );
        Ok(())
    }
}

/// Forwards `Event::ApprovalRequested` from the bus to every notifier.
///
/// Each delivery runs on its own task; the engine never waits on it.
pub struct NotificationDispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
    channels: Vec<String>,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            notifiers: Vec::new(),
            channels,
        }
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Subscribe to `bus` and dispatch until `Event::Shutdown` or the bus closes.
    pub fn spawn(self, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            let mut deliveries = Vec::new();
            loop {
                match rx.recv().await {
                    Ok(Event::ApprovalRequested {
                        approval_id,
                        agent_id,
                        command,
                        target_system,
                        status,
                        risk_score,
                        reason,
                    }) => {
                        let ticket = Arc::new(ApprovalTicket {
                            approval_id,
                            agent_id,
                            command,
                            target_system,
                            status,
                            risk_score,
                            reason,
                            channels: self.channels.clone(),
                        });
                        for notifier in &self.notifiers {
                            let notifier = Arc::clone(notifier);
                            let ticket = Arc::clone(&ticket);
                            deliveries.push(tokio::spawn(async move {
                                if let Err(e) = notifier.notify(&ticket).await {
                                    warn!(
                                        notifier = notifier.name(),
                                        approval_id = %ticket.approval_id,
                                        error = %e,
                                        "notification delivery failed"
                                    );
                                }
                            }));
                        }
                        deliveries.retain(|d: &JoinHandle<()>| !d.is_finished());
                    }
                    Ok(Event::Shutdown) => break,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notification dispatcher lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            // Let in-flight deliveries finish before the dispatcher exits.
            for d in deliveries {
                let _ = d.await;
            }
            debug!("notification dispatcher stopped");
        })
    }
}
