use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use arbiter_config::{ArbiterConfig, ConfigLoader, LoggingConfig};
use arbiter_core::{ArbiterError, AuditKind, HealthStatus};

mod audit;
mod constitution;
mod emergency;
mod evaluate;
mod session;
mod setup;

use session::Session;

/// Arbiter: a governance gate for autonomous agent actions
#[derive(Parser)]
#[command(name = "arbiter", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to arbiter.toml config file
    #[arg(short, long, global = true, env = "ARBITER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a proposed agent action against the active constitution
    Evaluate {
        /// Agent proposing the action
        #[arg(short, long)]
        agent: String,
        /// Target system (environment is inferred from it)
        #[arg(short, long)]
        target: String,
        /// Agent reputation in [0, 1]
        #[arg(short, long)]
        reputation: Option<f64>,
        /// Extra context as key=value (value parsed as JSON when possible)
        #[arg(long = "context", value_parser = parse_key_val)]
        context: Vec<(String, String)>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// The command the agent wants to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Evaluate newline-delimited JSON requests from stdin, one decision per line
    Batch,
    /// Show or replace the active constitution
    Constitution {
        #[command(subcommand)]
        action: ConstitutionAction,
    },
    /// Emergency stop: halt every evaluation until resumed
    Emergency {
        #[command(subcommand)]
        action: EmergencyAction,
    },
    /// Decision statistics over a recent window
    Metrics {
        /// Window in hours (default from config)
        #[arg(short, long)]
        window_hours: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show audit log entries, newest first
    Audit {
        /// Number of entries to show (default from config)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Entries to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Only show one kind (governance_decision, constitution_update, emergency_stop, emergency_resume)
        #[arg(short, long, value_parser = parse_audit_kind)]
        kind: Option<AuditKind>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show engine health
    Health {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Initialize a new arbiter.toml in the current or home directory
    Init {
        /// Create in current directory instead of ~/.arbiter/
        #[arg(long)]
        local: bool,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConstitutionAction {
    /// Print the active constitution
    Show {
        /// Output as JSON (with emergency-stop and durability status)
        #[arg(long)]
        json: bool,
    },
    /// Replace the active constitution with a TOML or JSON file
    Apply {
        file: PathBuf,
        /// Operator recorded in the audit log
        #[arg(long, default_value = "admin")]
        by: String,
    },
    /// Print the built-in default constitution as TOML
    Defaults,
}

#[derive(Subcommand)]
enum EmergencyAction {
    /// Activate the emergency stop
    Stop {
        #[arg(short, long)]
        reason: String,
        /// Operator initiating the stop
        #[arg(long)]
        by: String,
    },
    /// Clear the emergency stop (resume operators only)
    Resume {
        /// Operator clearing the stop
        #[arg(long)]
        by: String,
        #[arg(short, long, default_value = "manual resume")]
        reason: String,
    },
    /// Show emergency-stop state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse "key=value" CLI arguments.
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn parse_audit_kind(s: &str) -> std::result::Result<AuditKind, String> {
    s.trim().to_uppercase().replace('-', "_").parse()
}

/// Log level: --verbose > --quiet > --log-level > config.
fn resolve_log_level<'a>(cli: &'a Cli, logging: &'a LoggingConfig) -> &'a str {
    if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        cli.log_level.as_deref().unwrap_or(&logging.level)
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(format: &str, level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed (tests); keep it.
    let _ = match format {
        "json" => builder.json().with_target(true).try_init(),
        "compact" => builder.compact().with_target(false).try_init(),
        _ => builder.with_target(false).try_init(),
    };
}

fn print_json<T: serde::Serialize>(value: &T) -> arbiter_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Cli {
    pub async fn run(self) -> arbiter_core::Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        init_tracing(
            &config.logging.format,
            resolve_log_level(&self, &config.logging),
        );

        match self.command {
            Commands::Config { json } => Self::cmd_config(&config, json),
            Commands::Init { local } => setup::cmd_init(local),
            Commands::Completions { shell } => Self::cmd_completions(shell),
            Commands::Constitution {
                action: ConstitutionAction::Defaults,
            } => constitution::cmd_defaults(),
            command => {
                let session = Session::open(&config_loader, &config)?;
                let result = Self::dispatch(&session, &config, command).await;
                session.close().await;
                result
            }
        }
    }

    /// Commands that run against an initialized engine.
    async fn dispatch(
        session: &Session,
        config: &ArbiterConfig,
        command: Commands,
    ) -> arbiter_core::Result<()> {
        let engine = &session.engine;
        match command {
            Commands::Evaluate {
                agent,
                target,
                reputation,
                context,
                json,
                command,
            } => {
                let request =
                    evaluate::build_request(agent, target, command.join(" "), reputation, context);
                evaluate::cmd_evaluate(engine, &request, json)
            }
            Commands::Batch => evaluate::cmd_batch(engine).await,
            Commands::Constitution { action } => match action {
                ConstitutionAction::Show { json } => constitution::cmd_show(engine, json),
                ConstitutionAction::Apply { file, by } => {
                    constitution::cmd_apply(engine, &file, &by)
                }
                ConstitutionAction::Defaults => constitution::cmd_defaults(),
            },
            Commands::Emergency { action } => match action {
                EmergencyAction::Stop { reason, by } => emergency::cmd_stop(engine, &reason, &by),
                EmergencyAction::Resume { by, reason } => {
                    emergency::cmd_resume(engine, &by, &reason)
                }
                EmergencyAction::Status { json } => emergency::cmd_status(engine, json),
            },
            Commands::Metrics { window_hours, json } => audit::cmd_metrics(
                engine,
                window_hours.unwrap_or(config.audit.metrics_window_hours),
                json,
            ),
            Commands::Audit {
                limit,
                offset,
                kind,
                json,
            } => audit::cmd_audit(
                engine,
                limit.unwrap_or(config.audit.default_limit),
                offset,
                kind,
                json,
            ),
            Commands::Health { json } => Self::cmd_health(engine, json),
            Commands::Config { .. } | Commands::Init { .. } | Commands::Completions { .. } => {
                Ok(())
            }
        }
    }

    fn cmd_health(engine: &arbiter_engine::DecisionEngine, json: bool) -> arbiter_core::Result<()> {
        let report = engine.health_check();
        if json {
            return print_json(&report);
        }
        let status = match report.status {
            HealthStatus::Healthy => "\x1b[32mhealthy\x1b[0m",
            HealthStatus::Degraded => "\x1b[33mdegraded\x1b[0m",
            HealthStatus::Uninitialized => "\x1b[31muninitialized\x1b[0m",
        };
        println!("Status:              {status}");
        println!("Constitution loaded: {}", report.constitution_loaded);
        println!("Policy durable:      {}", report.policy_durable);
        println!("Emergency stop:      {}", report.emergency_stop_active);
        Ok(())
    }

    fn cmd_config(config: &ArbiterConfig, json: bool) -> arbiter_core::Result<()> {
        if json {
            print_json(config)
        } else {
            println!(
                "{}",
                toml::to_string_pretty(config).map_err(|e| ArbiterError::Config(e.to_string()))?
            );
            Ok(())
        }
    }

    fn cmd_completions(shell: Shell) -> arbiter_core::Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "arbiter", &mut std::io::stdout());
        Ok(())
    }
}

/// Truncate a string to `max` characters, appending "..." if truncated.
fn truncate_output(s: &str, max: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_evaluate_trailing_command() {
        let cli = Cli::try_parse_from([
            "arbiter", "evaluate", "-a", "agent-7", "-t", "prod-db", "-r", "0.95", "--",
            "sudo", "rm", "-rf", "/tmp/cache",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                agent,
                target,
                reputation,
                command,
                ..
            } => {
                assert_eq!(agent, "agent-7");
                assert_eq!(target, "prod-db");
                assert_eq!(reputation, Some(0.95));
                assert_eq!(command.join(" "), "sudo rm -rf /tmp/cache");
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["arbiter", "health", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Health { json: true }));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["arbiter", "-v", "-q", "health"]).is_err());
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("ticket=OPS-12").unwrap(),
            ("ticket".to_string(), "OPS-12".to_string())
        );
        assert_eq!(parse_key_val("a=b=c").unwrap().1, "b=c");
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn test_parse_audit_kind() {
        assert_eq!(parse_audit_kind("emergency-stop").unwrap(), AuditKind::EmergencyStop);
        assert_eq!(
            parse_audit_kind("governance_decision").unwrap(),
            AuditKind::GovernanceDecision
        );
        assert!(parse_audit_kind("login").is_err());
    }

    #[test]
    fn test_log_level_precedence() {
        let logging = LoggingConfig::default();
        let cli = Cli::try_parse_from(["arbiter", "-l", "warn", "health"]).unwrap();
        assert_eq!(resolve_log_level(&cli, &logging), "warn");
        let cli = Cli::try_parse_from(["arbiter", "-q", "-l", "warn", "health"]).unwrap();
        assert_eq!(resolve_log_level(&cli, &logging), "error");
        let cli = Cli::try_parse_from(["arbiter", "health"]).unwrap();
        assert_eq!(resolve_log_level(&cli, &logging), "info");
    }

    #[test]
    fn test_truncate_output() {
        assert_eq!(truncate_output("short", 10), "short");
        assert_eq!(truncate_output("a\nb", 10), "a b");
        assert_eq!(truncate_output("abcdefghijkl", 8), "abcde...");
    }
}
