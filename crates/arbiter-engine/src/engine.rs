use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

use arbiter_config::EngineConfig;
use arbiter_core::{
    ArbiterError, AuditPage, AuditStore, Constitution, ConstitutionView, Decision, DecisionStatus,
    EmergencyStopState, EvaluationRequest, Event, EventBus, HealthReport, HealthStatus,
    MetricsSummary, PolicyStore, Result, RiskLevel, UpdateOutcome,
};

use crate::audit::AuditLogger;
use crate::clock::{Clock, SystemClock};
use crate::constitution::ConstitutionStore;
use crate::emergency::EmergencyStopController;
use crate::scorer::RiskScorer;

/// The governance gate: turns an evaluation request into a decision.
pub struct DecisionEngine {
    policy: ConstitutionStore,
    policy_store: Arc<dyn PolicyStore>,
    emergency: EmergencyStopController,
    audit: AuditLogger,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    resume_operators: Vec<String>,
    async_approved_audit: bool,
    initialized: AtomicBool,
    /// Serializes policy and emergency-stop writers so the stored state
    /// always matches the state in force. Evaluation never takes it.
    write_lock: Mutex<()>,
}

impl DecisionEngine {
    pub fn new(
        config: &EngineConfig,
        policy_store: Arc<dyn PolicyStore>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        let bus = EventBus::default();
        Self {
            policy: ConstitutionStore::new(Arc::clone(&policy_store)),
            policy_store,
            emergency: EmergencyStopController::new(),
            audit: AuditLogger::new(audit_store, bus.clone(), config.top_agents),
            bus,
            clock: Arc::new(SystemClock),
            resume_operators: config.resume_operators.clone(),
            async_approved_audit: config.async_approved_audit,
            initialized: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the wall clock (tests pin the hour).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bus carrying decision, policy and emergency-stop events.
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Load the constitution and any persisted emergency stop.
    pub fn initialize(&self) -> Result<()> {
        let active = self.policy.load(self.clock.now());

        match self.policy_store.load_emergency_stop() {
            Ok(Some(state)) => {
                if state.active {
                    warn!(
                        initiated_by = %state.initiated_by,
                        reason = %state.reason,
                        "restoring active emergency stop"
                    );
                }
                self.emergency.restore(state);
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "failed to load emergency stop state"),
        }

        self.initialized.store(true, Ordering::SeqCst);
        info!(
            forbidden = active.constitution.forbidden_commands.len(),
            keywords = active.constitution.high_risk_keywords.len(),
            durable = self.policy.is_durable(),
            "arbiter engine initialized"
        );
        Ok(())
    }

    /// Start background work that needs a tokio runtime.
    pub fn start_background_tasks(&self) {
        if self.async_approved_audit {
            self.audit.start_background_writer();
        }
    }

    /// Drain the background audit writer and mark the engine uninitialized.
    pub async fn shutdown(&self) {
        self.audit.stop_background_writer().await;
        self.initialized.store(false, Ordering::SeqCst);
        self.bus.publish(Event::Shutdown);
        info!("arbiter engine shut down");
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ArbiterError::NotInitialized)
        }
    }

    // ── Evaluation ─────────────────────────────────────────────

    /// Evaluate a proposed action and record the decision.
    pub fn evaluate(&self, request: &EvaluationRequest) -> Result<Decision> {
        self.ensure_initialized()?;

        let decision = self.decide(request)?;

        info!(
            agent_id = %request.agent_id,
            target = %request.target_system,
            status = %decision.status,
            risk_score = decision.risk_score,
            "governance decision"
        );

        self.audit.record_decision(request, &decision);

        self.bus.publish(Event::DecisionMade {
            agent_id: request.agent_id.clone(),
            status: decision.status,
            risk_score: decision.risk_score,
        });
        if let Some(approval_id) = decision.approval_id {
            self.bus.publish(Event::ApprovalRequested {
                approval_id,
                agent_id: request.agent_id.clone(),
                command: request.command.clone(),
                target_system: request.target_system.clone(),
                status: decision.status,
                risk_score: decision.risk_score,
                reason: decision.reason.clone(),
            });
        }

        Ok(decision)
    }

    /// The ordered gates. Pure apart from reading the clock.
    fn decide(&self, request: &EvaluationRequest) -> Result<Decision> {
        // 1. Emergency stop
        if self.emergency.is_active() {
            return Ok(Decision::denied("Emergency stop is active", 100, "None"));
        }

        // One consistent policy for the whole evaluation.
        let policy = self.policy.snapshot().ok_or(ArbiterError::NotInitialized)?;
        let constitution = &policy.constitution;

        // 2. Forbidden commands
        if let Some(pattern) = constitution.forbidden_match(&request.command) {
            warn!(agent_id = %request.agent_id, pattern, "forbidden command detected");
            return Ok(Decision::denied(
                format!("Violates Constitution (Forbidden Command: {pattern})"),
                100,
                "None",
            ));
        }

        // 3-4. Score and classify
        let hour = self.clock.local_hour();
        let score = RiskScorer::new(constitution).score(request, hour);
        let level = constitution.approval_thresholds.classify(score);

        // 5. Business hours
        if level == RiskLevel::High && constitution.restricted_hours.contains(hour) {
            return Ok(Decision::escalated(
                DecisionStatus::Paused,
                "High risk action during business hours",
                score,
                "Human Approval (HITL)",
            ));
        }

        // 6. Environment rules
        if let Some(env) = request.environment() {
            if let Some(rule) = constitution.environment_violation(env, &request.command) {
                warn!(agent_id = %request.agent_id, rule, environment = %env, "environment rule violated");
                return Ok(Decision::denied(
                    format!("Environment rule violation: '{rule}' not allowed in {env} environment"),
                    score.saturating_add(20).min(100),
                    "None",
                ));
            }
        }

        // 7. Final mapping
        Ok(match level {
            RiskLevel::Critical => Decision::denied(
                "Risk score too high for autonomous execution",
                score,
                "Manual Intervention",
            ),
            RiskLevel::High => Decision::escalated(
                DecisionStatus::PendingApproval,
                "Risk exceeds autonomous threshold",
                score,
                "Slack/Teams Approval Sent",
            ),
            RiskLevel::Medium => {
                Decision::approved("Approved with monitoring", score, "Execute with Monitoring")
            }
            RiskLevel::Low => {
                Decision::approved("Within autonomous safety parameters", score, "Execute")
            }
        })
    }

    // ── Constitution ───────────────────────────────────────────

    pub fn get_constitution(&self) -> Result<ConstitutionView> {
        self.ensure_initialized()?;
        let policy = self.policy.snapshot().ok_or(ArbiterError::NotInitialized)?;
        Ok(ConstitutionView {
            constitution: policy.constitution.clone(),
            emergency_stop_active: self.emergency.is_active(),
            last_updated: policy.updated_at,
            durable: self.policy.is_durable(),
        })
    }

    /// Replace the constitution wholesale.
    ///
    /// An invalid policy is rejected and the active one is untouched. A store
    /// failure does not fail the update: the new policy is active but not durable.
    pub fn update_constitution(
        &self,
        constitution: Constitution,
        updated_by: &str,
    ) -> Result<UpdateOutcome> {
        self.ensure_initialized()?;
        constitution.validate()?;

        let _writer = self.write_lock.lock();
        let updated_at = self.clock.now();
        let active = self.policy.replace(constitution, updated_at);

        let durable = match self.policy.save(&active.constitution, updated_at) {
            Ok(()) => true,
            Err(e) => {
                self.bus.publish(Event::PolicyNotDurable {
                    error: e.to_string(),
                });
                false
            }
        };

        self.audit
            .record_constitution_update(&active.constitution, updated_by, durable);
        self.bus.publish(Event::ConstitutionUpdated {
            updated_by: updated_by.to_string(),
            durable,
        });
        info!(updated_by, durable, "constitution updated");

        Ok(UpdateOutcome {
            updated_by: updated_by.to_string(),
            updated_at,
            durable,
        })
    }

    /// Parse a JSON policy document (missing fields are validation errors) and apply it.
    pub fn update_constitution_json(
        &self,
        document: serde_json::Value,
        updated_by: &str,
    ) -> Result<UpdateOutcome> {
        self.ensure_initialized()?;
        let constitution = Constitution::from_json(document)?;
        self.update_constitution(constitution, updated_by)
    }

    // ── Emergency stop ─────────────────────────────────────────

    /// Block every subsequent evaluation until resumed.
    pub fn emergency_stop(&self, reason: &str, initiated_by: &str) -> EmergencyStopState {
        let _writer = self.write_lock.lock();
        let state = self.emergency.activate(reason, initiated_by, self.clock.now());
        error!(initiated_by, reason, "EMERGENCY STOP ACTIVATED");

        if let Err(e) = self.policy_store.save_emergency_stop(&state) {
            error!(error = %e, "failed to persist emergency stop");
        }
        self.audit.record_emergency_stop(reason, initiated_by);
        self.bus.publish(Event::EmergencyStopActivated {
            reason: reason.to_string(),
            initiated_by: initiated_by.to_string(),
            timestamp: state.activated_at,
        });
        state
    }

    /// Clear an active emergency stop. Only configured resume operators may do this.
    ///
    /// Returns `None` if no stop was active.
    pub fn resume(&self, operator: &str, reason: &str) -> Result<Option<EmergencyStopState>> {
        if !self.resume_operators.iter().any(|o| o == operator) {
            warn!(operator, "unauthorized emergency resume attempt");
            return Err(ArbiterError::Unauthorized {
                operator: operator.to_string(),
                action: "resume after an emergency stop".into(),
            });
        }

        let _writer = self.write_lock.lock();
        let now = self.clock.now();
        let Some(state) = self.emergency.clear(operator, now) else {
            info!(operator, "resume requested but no emergency stop is active");
            return Ok(None);
        };

        warn!(operator, reason, "emergency stop cleared");
        if let Err(e) = self.policy_store.save_emergency_stop(&state) {
            error!(error = %e, "failed to persist emergency resume");
        }
        self.audit.record_emergency_resume(operator, reason);
        self.bus.publish(Event::EmergencyStopCleared {
            resumed_by: operator.to_string(),
            timestamp: now,
        });
        Ok(Some(state))
    }

    pub fn is_emergency_stop_active(&self) -> bool {
        self.emergency.is_active()
    }

    pub fn emergency_state(&self) -> Option<EmergencyStopState> {
        self.emergency.state()
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn metrics(&self, window_hours: u32) -> Result<MetricsSummary> {
        self.audit
            .metrics(window_hours, self.clock.now(), self.emergency.is_active())
    }

    pub fn audit_log(&self, limit: usize, offset: usize) -> Result<AuditPage> {
        self.audit.audit_log(limit, offset)
    }

    pub fn health_check(&self) -> HealthReport {
        let initialized = self.initialized.load(Ordering::SeqCst);
        let durable = self.policy.is_durable();
        let status = if !initialized {
            HealthStatus::Uninitialized
        } else if !durable {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        HealthReport {
            status,
            emergency_stop_active: self.emergency.is_active(),
            constitution_loaded: self.policy.snapshot().is_some(),
            policy_durable: durable,
        }
    }
}
