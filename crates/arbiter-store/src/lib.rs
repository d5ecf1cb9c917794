//! # arbiter-store
//!
//! Document-store collaborators for the Arbiter engine:
//!
//! - **SqliteStore**: the active constitution, emergency-stop state and the
//!   append-only audit log in a single SQLite database (WAL mode).
//! - **MemoryStore**: the same contract held in process memory, for tests and
//!   deployments that accept a non-durable audit trail.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
