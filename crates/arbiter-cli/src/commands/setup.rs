use std::path::{Path, PathBuf};

const CONFIG_TEMPLATE: &str = r#"# Arbiter configuration
# Every key is optional; the values below are the defaults.

[engine]
# Operators allowed to clear an emergency stop
resume_operators = ["admin"]
# Audit approved decisions from a background writer
async_approved_audit = true
top_agents = 5

[store]
backend = "sqlite"   # or "memory" (nothing persists)
db_path = "arbiter.db"   # relative to this file

[audit]
default_limit = 100
metrics_window_hours = 24

[notifications]
enabled = true
channels = ["ops"]

[logging]
level = "info"
format = "pretty"   # "pretty", "compact" or "json"
"#;

pub(super) fn cmd_init(local: bool) -> arbiter_core::Result<()> {
    let dir = if local {
        std::env::current_dir()?
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".arbiter")
    };

    match write_config(&dir)? {
        Some(path) => {
            println!("✅ Created {}", path.display());
            println!("   Next: `arbiter constitution defaults > constitution.toml`, edit it,");
            println!("   then `arbiter constitution apply constitution.toml --by <you>`.");
        }
        None => {
            println!("⚠️  {} already exists", dir.join("arbiter.toml").display());
        }
    }
    Ok(())
}

/// Write the template into `dir`. Returns `None` if a config is already there.
fn write_config(dir: &Path) -> arbiter_core::Result<Option<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let config_path = dir.join("arbiter.toml");
    if config_path.exists() {
        return Ok(None);
    }
    std::fs::write(&config_path, CONFIG_TEMPLATE)?;
    Ok(Some(config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_config::ConfigLoader;

    #[test]
    fn test_template_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path()).unwrap().unwrap();

        let loader = ConfigLoader::load(Some(&path)).unwrap();
        let config = loader.get();
        assert_eq!(config.engine.resume_operators, vec!["admin".to_string()]);
        assert_eq!(config.audit.default_limit, 100);
        assert_eq!(loader.db_path(), dir.path().join("arbiter.db"));
    }

    #[test]
    fn test_existing_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("arbiter.toml"), "# mine\n").unwrap();
        assert!(write_config(dir.path()).unwrap().is_none());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("arbiter.toml")).unwrap(),
            "# mine\n"
        );
    }
}
