//! # arbiter-engine
//!
//! The governance decision engine. Evaluates a proposed agent action against the
//! active constitution through an ordered series of gates (emergency stop,
//! forbidden commands, risk classification, business hours, environment rules)
//! and returns an authoritative decision. Also owns the emergency-stop kill
//! switch, the audit logger, and fire-and-forget approval notifications.

pub mod audit;
pub mod clock;
pub mod constitution;
pub mod emergency;
pub mod engine;
pub mod notify;
pub mod scorer;

pub use audit::AuditLogger;
pub use clock::{Clock, FixedClock, SystemClock};
pub use constitution::{ActivePolicy, ConstitutionStore};
pub use emergency::EmergencyStopController;
pub use engine::DecisionEngine;
pub use notify::{ApprovalTicket, NotificationDispatcher, Notifier, TracingNotifier};
pub use scorer::{RiskAssessment, RiskFactor, RiskScorer};
