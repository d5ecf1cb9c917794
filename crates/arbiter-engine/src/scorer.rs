use serde::{Deserialize, Serialize};
use tracing::debug;

use arbiter_core::{Constitution, EvaluationRequest};

/// Commands longer than this many characters are treated as more complex.
pub const LONG_COMMAND_CHARS: usize = 100;

const LONG_COMMAND: i32 = 15;
const HIGH_RISK_KEYWORD: i32 = 25;
const PRODUCTION_TARGET: i32 = 35;
const DATABASE_TARGET: i32 = 20;
const POOR_REPUTATION: i32 = 30;
const EXCELLENT_REPUTATION: i32 = -10;
const AFTER_HOURS: i32 = 15;

/// One contribution to a risk score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub label: String,
    pub delta: i32,
}

/// A score plus the factors that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Clamped to 0-100.
    pub score: u8,
    /// Unclamped sum of all factors.
    pub raw: i32,
    pub factors: Vec<RiskFactor>,
}

/// Deterministic risk scoring against a constitution snapshot.
pub struct RiskScorer<'a> {
    constitution: &'a Constitution,
}

impl<'a> RiskScorer<'a> {
    pub fn new(constitution: &'a Constitution) -> Self {
        Self { constitution }
    }

    /// Score a request at the given local hour.
    pub fn score(&self, request: &EvaluationRequest, hour: u32) -> u8 {
        self.assess(request, hour).score
    }

    pub fn assess(&self, request: &EvaluationRequest, hour: u32) -> RiskAssessment {
        let command = request.command.to_lowercase();
        let target = request.target_system.to_lowercase();
        let mut factors = Vec::new();

        if request.command.chars().count() > LONG_COMMAND_CHARS {
            factors.push(factor("command longer than 100 characters", LONG_COMMAND));
        }

        for keyword in &self.constitution.high_risk_keywords {
            if command.contains(&keyword.to_lowercase()) {
                factors.push(factor(format!("high-risk keyword '{keyword}'"), HIGH_RISK_KEYWORD));
            }
        }

        if target.contains("prod") || target.contains("production") {
            factors.push(factor("production target", PRODUCTION_TARGET));
        }
        if target.contains("db") || target.contains("database") {
            factors.push(factor("database target", DATABASE_TARGET));
        }

        if let Some(reputation) = request.reputation() {
            if reputation < 0.5 {
                factors.push(factor("poor agent reputation", POOR_REPUTATION));
            } else if reputation > 0.9 {
                factors.push(factor("excellent agent reputation", EXCELLENT_REPUTATION));
            }
        }

        if !self.constitution.restricted_hours.contains(hour) {
            factors.push(factor("outside business hours", AFTER_HOURS));
        }

        let raw: i32 = factors.iter().map(|f| f.delta).sum();
        let score = raw.clamp(0, 100) as u8;

        for f in &factors {
            debug!(agent_id = %request.agent_id, factor = %f.label, delta = f.delta, "risk factor");
        }

        RiskAssessment { score, raw, factors }
    }
}

fn factor(label: impl Into<String>, delta: i32) -> RiskFactor {
    RiskFactor {
        label: label.into(),
        delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_can_go_negative_but_score_cannot() {
        let c = Constitution::default();
        let request = EvaluationRequest::new("a", "ls", "build-runner")
            .with_context("agentReputation", serde_json::json!(0.99));
        let a = RiskScorer::new(&c).assess(&request, 10);
        assert_eq!(a.raw, -10);
        assert_eq!(a.score, 0);
    }

    fn raw_for(request: &EvaluationRequest) -> i32 {
        RiskScorer::new(&Constitution::default()).assess(request, 10).raw
    }

    fn with_reputation(reputation: f64) -> EvaluationRequest {
        EvaluationRequest::new("a", "ls", "build-runner")
            .with_context("agentReputation", serde_json::json!(reputation))
    }

    #[test]
    fn test_long_command_boundary() {
        let at_limit = EvaluationRequest::new("a", "x".repeat(100), "build-runner");
        let over_limit = EvaluationRequest::new("a", "x".repeat(101), "build-runner");
        assert_eq!(raw_for(&at_limit), 0);
        assert_eq!(raw_for(&over_limit), 15);
    }

    #[test]
    fn test_long_command_counts_characters() {
        // 101 bytes but 51 characters.
        let multibyte = EvaluationRequest::new("a", format!("x{}", "é".repeat(50)), "build-runner");
        assert_eq!(raw_for(&multibyte), 0);
    }

    #[test]
    fn test_poor_reputation() {
        assert_eq!(raw_for(&with_reputation(0.2)), 30);
        assert_eq!(raw_for(&with_reputation(0.49)), 30);
    }

    #[test]
    fn test_reputation_boundaries_add_nothing() {
        assert_eq!(raw_for(&with_reputation(0.5)), 0);
        assert_eq!(raw_for(&with_reputation(0.9)), 0);
        assert_eq!(raw_for(&with_reputation(0.91)), -10);
    }

    #[test]
    fn test_missing_or_non_numeric_reputation_ignored() {
        assert_eq!(raw_for(&EvaluationRequest::new("a", "ls", "build-runner")), 0);
        let text = EvaluationRequest::new("a", "ls", "build-runner")
            .with_context("agentReputation", serde_json::json!("low"));
        assert_eq!(raw_for(&text), 0);
    }

    #[test]
    fn test_long_command_and_poor_reputation_stack() {
        let request = EvaluationRequest::new("a", "x".repeat(150), "build-runner")
            .with_context("agent_reputation", serde_json::json!(0.1));
        let a = RiskScorer::new(&Constitution::default()).assess(&request, 10);
        assert_eq!(a.raw, 15 + 30);
        assert_eq!(a.score, 45);
    }

    #[test]
    fn test_factor_labels() {
        let c = Constitution::default();
        let request = EvaluationRequest::new("a", "sudo reboot", "prod-db");
        let a = RiskScorer::new(&c).assess(&request, 3);
        let labels: Vec<_> = a.factors.iter().map(|f| f.label.as_str()).collect();
        assert!(labels.contains(&"high-risk keyword 'sudo'"));
        assert!(labels.contains(&"high-risk keyword 'reboot'"));
        assert!(labels.contains(&"production target"));
        assert!(labels.contains(&"database target"));
        assert!(labels.contains(&"outside business hours"));
        assert_eq!(a.raw, 25 + 25 + 35 + 20 + 15);
        assert_eq!(a.score, 100);
    }
}
