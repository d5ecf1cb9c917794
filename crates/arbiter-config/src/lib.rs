//! # arbiter-config
//!
//! Configuration system for the Arbiter governance engine. Reads from `arbiter.toml`
//! and environment variables, with environment variables taking precedence.

pub mod schema;
pub mod loader;

pub use schema::ArbiterConfig;
pub use schema::{
    AuditConfig, ConfigWarning, EngineConfig, LoggingConfig, NotificationsConfig, StoreBackend,
    StoreConfig, WarningSeverity,
};
pub use loader::ConfigLoader;
