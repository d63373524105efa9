use proto::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub disk: DiskConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub eval: EvalConfig,
    #[serde(default)]
    pub computer: ComputerConfig,
}

/// Operator approval settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthorizationConfig {
    /// Skip the approval prompt for sensitive actions.
    #[serde(default)]
    pub auto_execute: bool,
}

/// Disk sandbox settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskConfig {
    /// Directory every disk and doc path is confined to.
    #[serde(default = "default_disk_root")]
    pub root: PathBuf,
}

fn default_disk_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            root: default_disk_root(),
        }
    }
}

/// Database facade settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// SQLite URL or file path.
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.shared-tools/tools.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Browser facade settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Per-operation timeout in seconds.
    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,
    /// Chrome/Chromium executable; auto-detected when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

fn default_headless() -> bool {
    true
}

fn default_browser_timeout() -> u64 {
    15
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            timeout_secs: default_browser_timeout(),
            chrome_path: None,
        }
    }
}

impl BrowserConfig {
    pub fn settings(&self) -> tools::browser::ChromiumSettings {
        tools::browser::ChromiumSettings {
            headless: self.headless,
            timeout_secs: self.timeout_secs,
            chrome_path: self.chrome_path.clone(),
        }
    }
}

/// Eval facade settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalConfig {
    /// Default snippet timeout in seconds.
    #[serde(default = "default_eval_timeout")]
    pub timeout_secs: u64,
}

fn default_eval_timeout() -> u64 {
    tools::eval::DEFAULT_TIMEOUT_SECS
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_eval_timeout(),
        }
    }
}

/// Computer facade settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputerConfig {
    #[serde(default = "default_xdotool_path")]
    pub xdotool_path: PathBuf,
}

fn default_xdotool_path() -> PathBuf {
    PathBuf::from("xdotool")
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            xdotool_path: default_xdotool_path(),
        }
    }
}

impl Config {
    /// Loads configuration from explicit path, fallback locations, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            // Look in current dir, then home dir
            let cwd = std::env::current_dir().ok()?.join("config.toml");
            if cwd.exists() {
                return Some(cwd);
            }
            let home = std::env::var("HOME").ok()?;
            let home_config = PathBuf::from(home)
                .join(".shared-tools")
                .join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
            None
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            Self::parse(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;

        debug!(
            auto_execute = config.authorization.auto_execute,
            disk_root = %config.disk.root.display(),
            database_url = %config.database.url,
            "Config loaded"
        );
        Ok(config)
    }

    /// Parses TOML text; missing sections take their defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var("SHARED_TOOLS_AUTO_EXECUTE") {
            self.authorization.auto_execute = parse_flag(&raw).ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "SHARED_TOOLS_AUTO_EXECUTE".to_string(),
                    reason: format!("expected true or false, got '{raw}'"),
                }
            })?;
        }
        if let Ok(root) = std::env::var("SHARED_TOOLS_DISK_ROOT") {
            self.disk.root = PathBuf::from(root);
        }
        if let Ok(url) = std::env::var("SHARED_TOOLS_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(chrome) = std::env::var("SHARED_TOOLS_CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(chrome));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{remove_env_var, set_env_var, with_locked_env};

    const OVERRIDES: [&str; 4] = [
        "SHARED_TOOLS_AUTO_EXECUTE",
        "SHARED_TOOLS_DISK_ROOT",
        "SHARED_TOOLS_DATABASE_URL",
        "SHARED_TOOLS_CHROME_PATH",
    ];

    fn clear_overrides() {
        for key in OVERRIDES {
            remove_env_var(key);
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write config");
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert!(!cfg.authorization.auto_execute);
        assert_eq!(cfg.disk.root, PathBuf::from("."));
        assert!(cfg.database.url.ends_with(".shared-tools/tools.db"));
        assert!(cfg.browser.headless);
        assert_eq!(cfg.browser.timeout_secs, 15);
        assert_eq!(cfg.eval.timeout_secs, 30);
        assert_eq!(cfg.computer.xdotool_path, PathBuf::from("xdotool"));
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let cfg = Config::parse(
            r#"
[authorization]
auto_execute = true

[browser]
headless = false
"#,
        )
        .expect("parse");
        assert!(cfg.authorization.auto_execute);
        assert!(!cfg.browser.headless);
        assert_eq!(cfg.browser.timeout_secs, 15);
        assert_eq!(cfg.eval, EvalConfig::default());
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = Config::parse("[disk\nroot = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn browser_settings_carry_config_values() {
        let cfg = BrowserConfig {
            headless: false,
            timeout_secs: 5,
            chrome_path: Some(PathBuf::from("/usr/bin/chromium")),
        };
        let settings = cfg.settings();
        assert!(!settings.headless);
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn load_reads_explicit_path() {
        with_locked_env(|| {
            clear_overrides();
            let dir = tempfile::tempdir().expect("temp dir");
            let path = dir.path().join("custom.toml");
            write_file(
                &path,
                "[disk]\nroot = \"/srv/data\"\n\n[eval]\ntimeout_secs = 90\n",
            );

            let cfg = Config::load(Some(&path)).expect("load");
            assert_eq!(cfg.disk.root, PathBuf::from("/srv/data"));
            assert_eq!(cfg.eval.timeout_secs, 90);
        });
    }

    #[test]
    fn load_missing_explicit_path_is_io_error() {
        with_locked_env(|| {
            let dir = tempfile::tempdir().expect("temp dir");
            let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::Io(_)));
        });
    }

    #[test]
    fn env_overrides_win_over_file() {
        with_locked_env(|| {
            clear_overrides();
            let dir = tempfile::tempdir().expect("temp dir");
            let path = dir.path().join("config.toml");
            write_file(
                &path,
                "[database]\nurl = \"sqlite::memory:\"\n\n[disk]\nroot = \"/a\"\n",
            );
            set_env_var("SHARED_TOOLS_AUTO_EXECUTE", "yes");
            set_env_var("SHARED_TOOLS_DISK_ROOT", "/b");
            set_env_var("SHARED_TOOLS_DATABASE_URL", "/tmp/override.db");
            set_env_var("SHARED_TOOLS_CHROME_PATH", "/opt/chrome");

            let cfg = Config::load(Some(&path));
            clear_overrides();

            let cfg = cfg.expect("load");
            assert!(cfg.authorization.auto_execute);
            assert_eq!(cfg.disk.root, PathBuf::from("/b"));
            assert_eq!(cfg.database.url, "/tmp/override.db");
            assert_eq!(cfg.browser.chrome_path, Some(PathBuf::from("/opt/chrome")));
        });
    }

    #[test]
    fn invalid_auto_execute_override_is_rejected() {
        with_locked_env(|| {
            clear_overrides();
            let dir = tempfile::tempdir().expect("temp dir");
            let path = dir.path().join("config.toml");
            write_file(&path, "");
            set_env_var("SHARED_TOOLS_AUTO_EXECUTE", "maybe");

            let result = Config::load(Some(&path));
            clear_overrides();

            match result {
                Err(ConfigError::InvalidValue { field, .. }) => {
                    assert_eq!(field, "SHARED_TOOLS_AUTO_EXECUTE")
                }
                other => panic!("unexpected result: {other:?}"),
            }
        });
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag(""), None);
    }
}
