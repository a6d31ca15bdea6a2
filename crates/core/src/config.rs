//! Application configuration.
//!
//! Settings are layered from built-in defaults, an optional TOML file under
//! the user's config directory and `ITEMSTORE_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under `~/.config` holding configuration and data.
pub const CONFIG_DIR: &str = "itemstore";
/// File name of the configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "ITEMSTORE";

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# itemstore configuration

# Document the store saves to and loads from.
# data_file = "items.json"

# Append-only audit log. Remove the line to use the default location.
# audit_log = "audit.log"

# Pretty-print saved documents.
pretty = true
"#;

/// Runtime settings for an embedding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path of the persisted record document.
    pub data_file: PathBuf,
    /// Path of the audit log; `None` disables auditing.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
    /// Whether saved documents are pretty-printed.
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_pretty() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        let root = config_root();
        Self {
            data_file: root.join("items.json"),
            audit_log: Some(root.join("audit.log")),
            pretty: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location plus the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (if it exists) plus the environment.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_layered(path.as_ref(), Environment::with_prefix(ENV_PREFIX))
    }

    fn load_layered(path: &Path, environment: Environment) -> Result<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("data_file", defaults.data_file.to_string_lossy().into_owned())?
            .set_default("pretty", defaults.pretty)?
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let audit_log_set = settings.get_string("audit_log").is_ok();
        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        if !audit_log_set {
            config.audit_log = defaults.audit_log;
        }
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.data_file = resolve(base, config.data_file);
        config.audit_log = config
            .audit_log
            .filter(|log| !log.as_os_str().is_empty())
            .map(|log| resolve(base, log));
        Ok(config)
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Root directory for configuration and default data files.
pub fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

/// Default configuration file path.
pub fn config_path() -> PathBuf {
    config_root().join(CONFIG_FILE)
}

/// Write a commented default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_file_and_resolves_relative_paths() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "data_file = \"data/items.json\"\naudit_log = \"logs/audit.log\"\npretty = false\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_file, dir.path().join("data/items.json"));
        assert_eq!(config.audit_log, Some(dir.path().join("logs/audit.log")));
        assert!(!config.pretty);
        Ok(())
    }

    #[test]
    fn environment_overrides_file_values() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "data_file = \"from-file.json\"\naudit_log = \"audit.log\"\npretty = true\n",
        )?;

        let vars = config::Map::from([
            ("ITEMSTORE_PRETTY".to_string(), "false".to_string()),
            (
                "ITEMSTORE_DATA_FILE".to_string(),
                "from-env.json".to_string(),
            ),
            ("UNRELATED_PRETTY".to_string(), "true".to_string()),
        ]);
        let environment = Environment::with_prefix(ENV_PREFIX).source(Some(vars));

        let config = AppConfig::load_layered(&path, environment)?;
        assert_eq!(config.data_file, dir.path().join("from-env.json"));
        assert_eq!(config.audit_log, Some(dir.path().join("audit.log")));
        assert!(!config.pretty);
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        let defaults = AppConfig::default();
        assert_eq!(config.data_file, resolve(dir.path(), defaults.data_file));
        assert_eq!(
            config.audit_log,
            defaults.audit_log.map(|log| resolve(dir.path(), log))
        );
        assert!(config.pretty);
        Ok(())
    }

    #[test]
    fn empty_audit_log_disables_auditing() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "audit_log = \"\"\n")?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.audit_log, None);
        Ok(())
    }

    #[test]
    fn default_template_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        write_default_config(&path)?;
        assert!(path.exists());
        // Existing files are left alone.
        fs::write(&path, "pretty = false\n")?;
        write_default_config(&path)?;
        assert!(!AppConfig::load_from(&path)?.pretty);
        Ok(())
    }
}
