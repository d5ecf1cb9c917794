use arbiter_core::{AuditEntry, AuditKind, AuditRecord};
use arbiter_engine::DecisionEngine;

use super::{print_json, truncate_output};

pub(super) fn cmd_metrics(engine: &DecisionEngine, window_hours: u32, json: bool) -> arbiter_core::Result<()> {
    let m = engine.metrics(window_hours)?;
    if json {
        return print_json(&m);
    }

    println!("\x1b[1mDecisions\x1b[0m (last {}h): {}", m.window_hours, m.total_decisions);
    println!(
        "   approved {}  denied {}  pending approval {}  paused {}",
        m.approved, m.denied, m.pending_approval, m.paused
    );
    println!(
        "   approval rate {:.2}%  average risk {:.2}",
        m.approval_rate_percent, m.average_risk_score
    );
    if m.emergency_stop_active {
        println!("   \x1b[31memergency stop ACTIVE\x1b[0m");
    }
    if !m.top_agents.is_empty() {
        println!();
        println!("\x1b[1mTop agents\x1b[0m");
        for a in &m.top_agents {
            println!("   {:<32} {}", a.agent_id, a.count);
        }
    }
    Ok(())
}

pub(super) fn cmd_audit(
    engine: &DecisionEngine,
    limit: usize,
    offset: usize,
    kind: Option<AuditKind>,
    json: bool,
) -> arbiter_core::Result<()> {
    let page = engine.audit_log(limit, offset)?;
    let entries: Vec<&AuditEntry> = page
        .entries
        .iter()
        .filter(|e| kind.is_none_or(|k| e.kind() == k))
        .collect();

    if json {
        return print_json(&serde_json::json!({
            "entries": entries,
            "total": page.total,
            "limit": page.limit,
            "offset": page.offset,
        }));
    }

    if entries.is_empty() {
        println!(
            "No audit log entries{}",
            kind.map(|k| format!(" of kind {k}")).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "\x1b[1mAudit Log\x1b[0m ({} shown, {} total)",
        entries.len(),
        page.total
    );
    println!("{}", "-".repeat(80));

    for entry in entries {
        // Color-code by kind
        let color = match entry.kind() {
            AuditKind::GovernanceDecision => "\x1b[36m",
            AuditKind::ConstitutionUpdate => "\x1b[35m",
            AuditKind::EmergencyStop => "\x1b[31m",
            AuditKind::EmergencyResume => "\x1b[33m",
        };
        let tamper = if entry.verify() { "" } else { "  \x1b[31m[checksum mismatch]\x1b[0m" };
        println!(
            "\x1b[90m{}\x1b[0m  {color}{}\x1b[0m  {}{tamper}",
            entry.timestamp.to_rfc3339(),
            entry.kind(),
            entry.actor()
        );
        println!("   \x1b[90m{}\x1b[0m", truncate_output(&describe(&entry.record), 120));
    }

    Ok(())
}

fn describe(record: &AuditRecord) -> String {
    match record {
        AuditRecord::GovernanceDecision {
            command,
            target_system,
            decision,
            ..
        } => format!(
            "{} ({}) on {target_system}: {command}",
            decision.status, decision.risk_score
        ),
        AuditRecord::ConstitutionUpdate { durable, .. } => {
            if *durable {
                "constitution replaced".to_string()
            } else {
                "constitution replaced (not persisted)".to_string()
            }
        }
        AuditRecord::EmergencyStop { reason, severity, .. } => format!("[{severity}] {reason}"),
        AuditRecord::EmergencyResume { reason, .. } => reason.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::Decision;

    #[test]
    fn test_describe_decision() {
        let record = AuditRecord::GovernanceDecision {
            agent_id: "a".into(),
            command: "drop table t".into(),
            target_system: "staging-db".into(),
            decision: Decision::denied("no", 100, "None"),
        };
        assert_eq!(describe(&record), "DENIED (100) on staging-db: drop table t");
    }
}
