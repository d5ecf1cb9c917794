use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ArbiterError, Result};
use crate::types::{Environment, RiskLevel};

/// The active policy document governing which agent actions are allowed.
///
/// A constitution is an immutable value once it has been validated and handed
/// to the engine; updates replace it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constitution {
    /// Substrings that block a command outright (case-insensitive).
    #[serde(alias = "forbiddenCommands")]
    pub forbidden_commands: Vec<String>,
    /// Substrings that each add to a command's risk score.
    #[serde(alias = "highRiskKeywords")]
    pub high_risk_keywords: Vec<String>,
    /// The "business hours" window, in local hour-of-day.
    #[serde(alias = "restrictedHours")]
    pub restricted_hours: RestrictedHours,
    #[serde(alias = "approvalThresholds")]
    pub approval_thresholds: ApprovalThresholds,
    /// Environment name ("production", "staging", "development") to restricted substrings.
    #[serde(alias = "environmentRules")]
    pub environment_rules: BTreeMap<String, Vec<String>>,
}

/// Hour-of-day window `[start, end)`. A window with `start > end` wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedHours {
    pub start: u32,
    pub end: u32,
}

impl RestrictedHours {
    /// Whether `hour` (0-23) falls inside the window.
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            self.start <= hour && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

/// Score thresholds separating the risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalThresholds {
    #[serde(alias = "autoApprove")]
    pub auto_approve: u8,
    #[serde(alias = "humanApproval")]
    pub human_approval: u8,
    pub blocked: u8,
}

impl ApprovalThresholds {
    /// Classify a risk score. Monotonic in `score` for valid thresholds.
    pub fn classify(&self, score: u8) -> RiskLevel {
        if score >= self.blocked {
            RiskLevel::Critical
        } else if score >= self.human_approval {
            RiskLevel::High
        } else if score >= self.auto_approve {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl Default for ApprovalThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 20,
            human_approval: 50,
            blocked: 80,
        }
    }
}

impl Default for RestrictedHours {
    fn default() -> Self {
        Self { start: 9, end: 17 }
    }
}

impl Default for Constitution {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut environment_rules = BTreeMap::new();
        environment_rules.insert(
            Environment::Production.as_str().to_string(),
            strings(&["restart", "stop", "kill", "terminate"]),
        );
        environment_rules.insert(
            Environment::Staging.as_str().to_string(),
            strings(&["drop", "delete", "truncate"]),
        );
        environment_rules.insert(Environment::Development.as_str().to_string(), Vec::new());

        Self {
            forbidden_commands: strings(&[
                "rm -rf /",
                "drop table",
                "shutdown -h now",
                "format c:",
                "dd if=/dev/zero",
                ":(){ :|:& };:",
                "sudo rm -rf /",
                "chmod 777 /etc/shadow",
            ]),
            restricted_hours: RestrictedHours::default(),
            high_risk_keywords: strings(&[
                "firewall", "iptables", "sudo", "chmod 777", "delete", "remove", "drop",
                "truncate", "reboot", "shutdown", "halt", "poweroff",
            ]),
            approval_thresholds: ApprovalThresholds::default(),
            environment_rules,
        }
    }
}

impl Constitution {
    /// Parse and validate a constitution from a JSON document.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let constitution: Self = serde_json::from_value(value)
            .map_err(|e| ArbiterError::validation("constitution", e.to_string()))?;
        constitution.validate()?;
        Ok(constitution)
    }

    /// Parse and validate a constitution from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let constitution: Self = toml::from_str(raw)
            .map_err(|e| ArbiterError::validation("constitution", e.to_string()))?;
        constitution.validate()?;
        Ok(constitution)
    }

    /// First forbidden pattern contained in `command`, compared case-insensitively.
    pub fn forbidden_match(&self, command: &str) -> Option<&str> {
        let command = command.to_lowercase();
        self.forbidden_commands
            .iter()
            .find(|pattern| command.contains(&pattern.to_lowercase()))
            .map(String::as_str)
    }

    /// First rule for `env` contained in `command`, compared case-insensitively.
    pub fn environment_violation(&self, env: Environment, command: &str) -> Option<&str> {
        let command = command.to_lowercase();
        self.environment_rules
            .get(env.as_str())?
            .iter()
            .find(|rule| command.contains(&rule.to_lowercase()))
            .map(String::as_str)
    }

    /// Check the structural invariants. Returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        check_patterns("forbidden_commands", &self.forbidden_commands)?;
        check_patterns("high_risk_keywords", &self.high_risk_keywords)?;

        let hours = &self.restricted_hours;
        if hours.start > 23 {
            return Err(ArbiterError::validation(
                "restricted_hours.start",
                format!("hour {} is outside 0-23", hours.start),
            ));
        }
        if hours.end > 24 {
            return Err(ArbiterError::validation(
                "restricted_hours.end",
                format!("hour {} is outside 0-24", hours.end),
            ));
        }
        if hours.start == hours.end {
            return Err(ArbiterError::validation(
                "restricted_hours",
                "start and end must differ",
            ));
        }

        let t = &self.approval_thresholds;
        for (field, value) in [
            ("approval_thresholds.auto_approve", t.auto_approve),
            ("approval_thresholds.human_approval", t.human_approval),
            ("approval_thresholds.blocked", t.blocked),
        ] {
            if value > 100 {
                return Err(ArbiterError::validation(
                    field,
                    format!("{value} is outside 0-100"),
                ));
            }
        }
        if !(t.auto_approve < t.human_approval && t.human_approval < t.blocked) {
            return Err(ArbiterError::validation(
                "approval_thresholds",
                format!(
                    "expected auto_approve < human_approval < blocked, got {} / {} / {}",
                    t.auto_approve, t.human_approval, t.blocked
                ),
            ));
        }

        for (env, rules) in &self.environment_rules {
            if env.parse::<Environment>().is_err() {
                return Err(ArbiterError::validation(
                    format!("environment_rules.{env}"),
                    "unknown environment (expected production, staging or development)",
                ));
            }
            check_patterns(&format!("environment_rules.{env}"), rules)?;
        }

        Ok(())
    }
}

/// An empty pattern would match every command.
fn check_patterns(field: &str, patterns: &[String]) -> Result<()> {
    if let Some(idx) = patterns.iter().position(|p| p.trim().is_empty()) {
        return Err(ArbiterError::validation(
            format!("{field}[{idx}]"),
            "pattern must not be empty",
        ));
    }
    Ok(())
}
