use arbiter_engine::DecisionEngine;

use super::print_json;

pub(super) fn cmd_stop(engine: &DecisionEngine, reason: &str, by: &str) -> arbiter_core::Result<()> {
    let state = engine.emergency_stop(reason, by);
    println!("🛑 Emergency stop active since {}", state.activated_at.to_rfc3339());
    println!("   Every evaluation is denied until an operator runs `arbiter emergency resume`.");
    Ok(())
}

pub(super) fn cmd_resume(engine: &DecisionEngine, by: &str, reason: &str) -> arbiter_core::Result<()> {
    match engine.resume(by, reason)? {
        Some(state) => {
            println!(
                "✅ Emergency stop cleared by {by} (was raised by {}: {})",
                state.initiated_by, state.reason
            );
        }
        None => println!("No emergency stop is active."),
    }
    Ok(())
}

pub(super) fn cmd_status(engine: &DecisionEngine, json: bool) -> arbiter_core::Result<()> {
    let state = engine.emergency_state();
    if json {
        return print_json(&serde_json::json!({
            "active": engine.is_emergency_stop_active(),
            "state": state,
        }));
    }

    match state {
        Some(s) if s.active => {
            println!("\x1b[31m\x1b[1mACTIVE\x1b[0m");
            println!("   initiated by: {}", s.initiated_by);
            println!("   reason:       {}", s.reason);
            println!("   since:        {}", s.activated_at.to_rfc3339());
        }
        Some(s) => {
            println!("\x1b[32minactive\x1b[0m");
            if let (Some(by), Some(at)) = (s.resumed_by, s.resumed_at) {
                println!(
                    "   last stop by {} ({}), resumed by {by} at {}",
                    s.initiated_by,
                    s.reason,
                    at.to_rfc3339()
                );
            }
        }
        None => println!("\x1b[32minactive\x1b[0m"),
    }
    Ok(())
}
