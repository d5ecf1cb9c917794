use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration, maps to `arbiter.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub engine: EngineConfig,
    pub store: StoreConfig,
    pub audit: AuditConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

// ── Engine ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Operators allowed to clear an active emergency stop.
    pub resume_operators: Vec<String>,
    /// Audit LOW/MEDIUM approvals from a background writer instead of inline.
    pub async_approved_audit: bool,
    /// Number of agents reported in the metrics top list.
    pub top_agents: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resume_operators: vec!["admin".into()],
            async_approved_audit: true,
            top_agents: 5,
        }
    }
}

// ── Store ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Path to the SQLite database. Relative paths resolve against the config directory.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            db_path: PathBuf::from("arbiter.db"),
        }
    }
}

// ── Audit ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Page size used when none is given.
    pub default_limit: usize,
    /// Window used for metrics when none is given.
    pub metrics_window_hours: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            metrics_window_hours: 24,
        }
    }
}

// ── Notifications ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Dispatch approval requests to notifiers.
    pub enabled: bool,
    /// Channel labels attached to each escalation (e.g. "ops", "security").
    pub channels: Vec<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: vec!["ops".into()],
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
            WarningSeverity::Info => "info",
        };
        write!(f, "{}: {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({})", h)?;
        }
        Ok(())
    }
}

impl ArbiterConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Resume operators ───
        if self.engine.resume_operators.is_empty() {
            warnings.push(ConfigWarning {
                field: "engine.resume_operators".into(),
                message: "no operator can clear an emergency stop".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Add at least one operator, e.g. [\"admin\"]".into()),
            });
        }
        if self.engine.resume_operators.iter().any(|o| o.trim().is_empty()) {
            warnings.push(ConfigWarning {
                field: "engine.resume_operators".into(),
                message: "contains an empty operator name".into(),
                severity: WarningSeverity::Error,
                hint: None,
            });
        }

        if self.engine.top_agents == 0 {
            warnings.push(ConfigWarning {
                field: "engine.top_agents".into(),
                message: "top agents list will always be empty".into(),
                severity: WarningSeverity::Info,
                hint: Some("The usual value is 5".into()),
            });
        }

        // ── Store ───
        if self.store.backend == StoreBackend::Sqlite && self.store.db_path.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                field: "store.db_path".into(),
                message: "database path is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'arbiter.db'".into()),
            });
        }
        if self.store.backend == StoreBackend::Memory {
            warnings.push(ConfigWarning {
                field: "store.backend".into(),
                message: "memory backend keeps policy and audit log only for this process".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Use 'sqlite' for durable compliance records".into()),
            });
        }

        // ── Audit ───
        if self.audit.default_limit == 0 {
            warnings.push(ConfigWarning {
                field: "audit.default_limit".into(),
                message: "default page size is 0".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 100".into()),
            });
        }
        if self.audit.metrics_window_hours == 0 {
            warnings.push(ConfigWarning {
                field: "audit.metrics_window_hours".into(),
                message: "metrics window is 0 hours".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 24".into()),
            });
        }

        // ── Notifications ───
        if self.notifications.enabled && self.notifications.channels.is_empty() {
            warnings.push(ConfigWarning {
                field: "notifications.channels".into(),
                message: "notifications enabled but no channels listed".into(),
                severity: WarningSeverity::Info,
                hint: None,
            });
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        // Check for hard errors
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
