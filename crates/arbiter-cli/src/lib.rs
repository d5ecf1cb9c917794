//! # arbiter-cli
//!
//! Command-line interface for the Arbiter governance engine.
//!
//! ## Commands
//!
//! - `arbiter evaluate`: Evaluate a proposed agent action
//! - `arbiter batch`: Evaluate newline-delimited JSON requests from stdin
//! - `arbiter constitution`: Show, apply or reset the active constitution
//! - `arbiter emergency`: Activate, resume or inspect the emergency stop
//! - `arbiter metrics`: Decision statistics over a time window
//! - `arbiter audit`: Page through the audit log
//! - `arbiter health`: Engine health
//! - `arbiter config`: Show configuration

pub mod commands;

pub use commands::Cli;
