//! # arbiter-core
//!
//! Core types, traits, and primitives for the Arbiter governance engine.
//! This crate defines the shared vocabulary used by every other crate in the workspace:
//! the constitution (policy) model, evaluation requests and decisions, audit entries,
//! the persistent store seams, and the system event bus.

pub mod audit;
pub mod error;
pub mod event;
pub mod policy;
pub mod store;
pub mod types;

pub use audit::{AuditEntry, AuditKind, AuditPage, AuditRecord, AgentVolume, MetricsSummary};
pub use error::{ArbiterError, Result};
pub use event::{Event, EventBus};
pub use policy::{ApprovalThresholds, Constitution, RestrictedHours};
pub use store::{AuditStore, PolicyStore, StoredConstitution};
pub use types::*;
