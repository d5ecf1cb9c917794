use std::path::Path;

use arbiter_core::{ArbiterError, Constitution};
use arbiter_engine::DecisionEngine;

use super::print_json;

fn to_toml(constitution: &Constitution) -> arbiter_core::Result<String> {
    toml::to_string_pretty(constitution).map_err(|e| ArbiterError::Config(e.to_string()))
}

pub(super) fn cmd_show(engine: &DecisionEngine, json: bool) -> arbiter_core::Result<()> {
    let view = engine.get_constitution()?;
    if json {
        return print_json(&view);
    }
    println!("# Last updated: {}", view.last_updated.to_rfc3339());
    if !view.durable {
        println!("# WARNING: not persisted, will not survive a restart");
    }
    if view.emergency_stop_active {
        println!("# EMERGENCY STOP ACTIVE");
    }
    println!();
    print!("{}", to_toml(&view.constitution)?);
    Ok(())
}

/// Read a constitution from a `.json` file, or TOML otherwise.
pub(super) fn read_constitution(path: &Path) -> arbiter_core::Result<Constitution> {
    let raw = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Constitution::from_json(value)
    } else {
        Constitution::from_toml_str(&raw)
    }
}

pub(super) fn cmd_apply(engine: &DecisionEngine, file: &Path, by: &str) -> arbiter_core::Result<()> {
    let constitution = read_constitution(file)?;
    let outcome = engine.update_constitution(constitution, by)?;
    println!(
        "✅ Constitution updated by {} at {}",
        outcome.updated_by,
        outcome.updated_at.to_rfc3339()
    );
    if !outcome.durable {
        println!("⚠️  The store rejected the write: the new policy applies to this process only.");
    }
    Ok(())
}

pub(super) fn cmd_defaults() -> arbiter_core::Result<()> {
    print!("{}", to_toml(&Constitution::default())?);
    Ok(())
}
