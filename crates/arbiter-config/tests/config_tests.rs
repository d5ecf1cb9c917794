#[cfg(test)]
mod tests {
    use arbiter_config::ConfigLoader;
    use arbiter_config::schema::*;
    use std::io::Write;

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.resume_operators, vec!["admin".to_string()]);
        assert!(config.async_approved_audit);
        assert_eq!(config.top_agents, 5);
    }

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.db_path, std::path::PathBuf::from("arbiter.db"));
    }

    #[test]
    fn test_audit_config_defaults() {
        let config = AuditConfig::default();
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.metrics_window_hours, 24);
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "pretty");
    }

    #[test]
    fn test_defaults_validate_cleanly() {
        let warnings = ArbiterConfig::default().validate().unwrap();
        assert!(warnings.iter().all(|w| w.severity != WarningSeverity::Error));
    }

    // ── TOML tests ─────────────────────────────────────────────

    #[test]
    fn test_config_toml_roundtrip() {
        let config = ArbiterConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: ArbiterConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(restored.engine.resume_operators, config.engine.resume_operators);
        assert_eq!(restored.store.backend, config.store.backend);
        assert_eq!(restored.audit.default_limit, config.audit.default_limit);
    }

    #[test]
    fn test_partial_toml_applies_defaults() {
        let toml_str = r#"
[engine]
resume_operators = ["alice", "bob"]

[store]
backend = "memory"
"#;
        let config: ArbiterConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.resume_operators, vec!["alice", "bob"]);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        // Defaults should fill in
        assert!(config.engine.async_approved_audit);
        assert_eq!(config.audit.metrics_window_hours, 24);
        assert!(config.notifications.enabled);
    }

    // ── Validation tests ───────────────────────────────────────

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = ArbiterConfig::default();
        config.audit.metrics_window_hours = 0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("audit.metrics_window_hours"));
    }

    #[test]
    fn test_validate_warns_without_resume_operators() {
        let mut config = ArbiterConfig::default();
        config.engine.resume_operators.clear();
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "engine.resume_operators"));
    }

    #[test]
    fn test_validate_rejects_blank_operator() {
        let mut config = ArbiterConfig::default();
        config.engine.resume_operators.push(" ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warning_display() {
        let w = ConfigWarning {
            field: "logging.format".into(),
            message: "unknown log format 'xml'".into(),
            severity: WarningSeverity::Warning,
            hint: Some("Valid values: pretty, json, compact".into()),
        };
        let s = w.to_string();
        assert!(s.starts_with("warning: logging.format"));
        assert!(s.contains("Valid values"));
    }

    // ── ConfigLoader tests ─────────────────────────────────────

    #[test]
    fn test_config_loader_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("arbiter.toml");
        let mut f = std::fs::File::create(&config_path).unwrap();
        writeln!(
            f,
            r#"
[engine]
top_agents = 3

[audit]
default_limit = 25

[logging]
format = "json"
"#
        )
        .unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        let config = loader.get();
        assert_eq!(config.engine.top_agents, 3);
        assert_eq!(config.audit.default_limit, 25);
        assert_eq!(config.logging.format, "json");
        assert_eq!(loader.path(), config_path.as_path());
    }

    #[test]
    fn test_config_loader_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("arbiter.toml");
        std::fs::write(&config_path, "[audit]\ndefault_limit = 0\n").unwrap();
        assert!(ConfigLoader::load(Some(config_path.as_path())).is_err());
    }

    #[test]
    fn test_config_loader_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("arbiter.toml");
        std::fs::write(&config_path, "[engine\n").unwrap();
        assert!(ConfigLoader::load(Some(config_path.as_path())).is_err());
    }

    #[test]
    fn test_db_path_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("arbiter.toml");
        std::fs::write(&config_path, "[store]\ndb_path = \"gate.db\"\n").unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        if std::env::var("ARBITER_DB_PATH").is_err() {
            assert_eq!(loader.db_path(), dir.path().join("gate.db"));
        }
    }

    #[test]
    fn test_config_loader_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("arbiter.toml");

        std::fs::write(&config_path, "[engine]\ntop_agents = 2\n").unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        assert_eq!(loader.get().engine.top_agents, 2);

        std::fs::write(&config_path, "[engine]\ntop_agents = 7\n").unwrap();

        loader.reload().unwrap();
        assert_eq!(loader.get().engine.top_agents, 7);
    }

    #[test]
    fn test_reload_keeps_config_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("arbiter.toml");
        std::fs::write(&config_path, "[engine]\ntop_agents = 4\n").unwrap();
        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();

        std::fs::write(&config_path, "[engine\n").unwrap();
        assert!(loader.reload().is_err());
        assert_eq!(loader.get().engine.top_agents, 4);
    }

    // ── JSON roundtrip ─────────────────────────────────────────

    #[test]
    fn test_config_json_roundtrip() {
        let config = ArbiterConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: ArbiterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.notifications.channels, config.notifications.channels);
    }
}
