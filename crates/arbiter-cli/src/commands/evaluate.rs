use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use arbiter_core::{Decision, DecisionStatus, EvaluationRequest};
use arbiter_engine::DecisionEngine;

use super::print_json;

pub(super) fn build_request(
    agent: String,
    target: String,
    command: String,
    reputation: Option<f64>,
    context: Vec<(String, String)>,
) -> EvaluationRequest {
    let mut request = EvaluationRequest::new(agent, command, target);
    for (key, raw) in context {
        request = request.with_context(&key, context_value(&raw));
    }
    if let Some(reputation) = reputation {
        request = request.with_context("agentReputation", serde_json::json!(reputation));
    }
    request
}

/// `0.9`, `true` and `{"a":1}` keep their JSON type; anything else is a string.
fn context_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

pub(super) fn cmd_evaluate(
    engine: &DecisionEngine,
    request: &EvaluationRequest,
    json: bool,
) -> arbiter_core::Result<()> {
    let decision = engine.evaluate(request)?;
    if json {
        return print_json(&decision);
    }
    print_decision(&decision);
    Ok(())
}

fn print_decision(decision: &Decision) {
    let color = match decision.status {
        DecisionStatus::Approved => "\x1b[32m",
        DecisionStatus::Denied => "\x1b[31m",
        DecisionStatus::Paused | DecisionStatus::PendingApproval => "\x1b[33m",
    };
    println!(
        "{color}\x1b[1m{}\x1b[0m  risk {}/100",
        decision.status, decision.risk_score
    );
    println!("   reason: {}", decision.reason);
    println!("   action: {}", decision.action_required);
    if let Some(id) = decision.approval_id {
        println!("   approval id: {id}");
    }
}

/// One JSON request per stdin line; one JSON decision (or error) per stdout line.
pub(super) async fn cmd_batch(engine: &DecisionEngine) -> arbiter_core::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<EvaluationRequest>(&line) {
            Ok(request) => match engine.evaluate(&request) {
                Ok(decision) => serde_json::json!({
                    "line": line_no,
                    "agent_id": request.agent_id,
                    "decision": decision,
                }),
                Err(e) => serde_json::json!({ "line": line_no, "error": e.to_string() }),
            },
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed request");
                serde_json::json!({ "line": line_no, "error": format!("malformed request: {e}") })
            }
        };
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_value_types() {
        assert_eq!(context_value("0.5"), serde_json::json!(0.5));
        assert_eq!(context_value("true"), serde_json::json!(true));
        assert_eq!(context_value("OPS-12"), serde_json::json!("OPS-12"));
    }

    #[test]
    fn test_build_request_reputation_wins() {
        let request = build_request(
            "a".into(),
            "prod-db".into(),
            "ls".into(),
            Some(0.2),
            vec![("agentReputation".into(), "0.99".into())],
        );
        assert_eq!(request.reputation(), Some(0.2));
        assert_eq!(request.target_system, "prod-db");
    }
}
