//! Configuration loading for sessiondb.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.sessiondb/config.toml`)
//! 3. User config (`~/.sessiondb/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! The loaded [`Config`] is meant to be built once and shared by `Arc` with
//! every store and datastore in the process. It is never mutated after the
//! first query.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::core::validate::validate_table_name;
use crate::error::{Result, SessionError};

/// Main configuration struct for sessiondb.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Datastore connection parameters.
    pub database: DatabaseConfig,
    /// Advisory lock behavior.
    pub locking: LockingConfig,
}

/// Datastore connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database name. For SQLite this is the file path or `:memory:`.
    pub name: String,
    /// Database host. Unused by the SQLite datastore.
    pub host: String,
    /// User the store connects as.
    pub user: String,
    /// Credential for `user`, if the datastore needs one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Table holding session rows.
    pub table: String,
}

/// Default table name.
pub const DEFAULT_TABLE: &str = "sessions";

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: "localhost".to_string(),
            user: String::new(),
            password: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

/// How the lock flag is taken on read.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Fetch, inspect the flag, then set it. Two readers can race between
    /// the fetch and the set.
    #[default]
    Advisory,
    /// Take the flag with a single compare-and-swap update.
    Atomic,
}

/// What `read` does when the lock is still held after the timeout.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutPolicy {
    /// Read anyway and leave the stale flag as it is. Last write wins.
    #[default]
    Proceed,
    /// Return [`SessionError::LockTimeout`].
    Fail,
}

impl FromStr for LockMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "advisory" => Ok(Self::Advisory),
            "atomic" => Ok(Self::Atomic),
            other => Err(SessionError::invalid_parameter(
                "locking.mode",
                format!("expected \"advisory\" or \"atomic\", got {other:?}"),
            )),
        }
    }
}

impl FromStr for TimeoutPolicy {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "proceed" => Ok(Self::Proceed),
            "fail" => Ok(Self::Fail),
            other => Err(SessionError::invalid_parameter(
                "locking.on_timeout",
                format!("expected \"proceed\" or \"fail\", got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advisory => write!(f, "advisory"),
            Self::Atomic => write!(f, "atomic"),
        }
    }
}

impl fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proceed => write!(f, "proceed"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Advisory lock configuration.
///
/// `sleep_seconds` and `timeout_seconds` are kept signed so that a negative
/// value in a config file surfaces as [`SessionError::InvalidParameter`]
/// instead of a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LockingConfig {
    /// Whether `read` honors and sets the lock flag.
    pub enabled: bool,
    /// Seconds between polls while waiting for a lock.
    pub sleep_seconds: i64,
    /// Seconds to wait for a lock before giving up.
    pub timeout_seconds: i64,
    /// How the lock is taken.
    pub mode: LockMode,
    /// What happens when the wait times out.
    pub on_timeout: TimeoutPolicy,
}

/// Default poll interval in seconds.
pub const DEFAULT_SLEEP_SECONDS: i64 = 1;

/// Default lock-wait timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 15;

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sleep_seconds: DEFAULT_SLEEP_SECONDS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            mode: LockMode::default(),
            on_timeout: TimeoutPolicy::default(),
        }
    }
}

impl LockingConfig {
    /// Build a validated locking configuration.
    pub fn new(enabled: bool, sleep_seconds: i64, timeout_seconds: i64) -> Result<Self> {
        let config = Self {
            enabled,
            sleep_seconds,
            timeout_seconds,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Locking switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the lock mode.
    pub fn with_mode(mut self, mode: LockMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the timeout policy.
    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.on_timeout = policy;
        self
    }

    /// Check that both intervals are positive.
    pub fn validate(&self) -> Result<()> {
        positive("locking.sleep_seconds", self.sleep_seconds)?;
        positive("locking.timeout_seconds", self.timeout_seconds)?;
        Ok(())
    }

    /// Poll interval in whole seconds. Zero if the config never passed
    /// [`validate`](Self::validate).
    pub fn sleep_secs(&self) -> u64 {
        u64::try_from(self.sleep_seconds).unwrap_or_default()
    }

    /// Timeout in whole seconds.
    pub fn timeout_secs(&self) -> u64 {
        u64::try_from(self.timeout_seconds).unwrap_or_default()
    }

    /// Poll interval as a `Duration`.
    pub fn sleep(&self) -> Duration {
        Duration::from_secs(self.sleep_secs())
    }
}

/// Reject zero and negative values.
pub fn positive(name: &str, value: i64) -> Result<u64> {
    if value > 0 {
        Ok(value as u64)
    } else {
        Err(SessionError::invalid_parameter(
            name,
            format!("must be a positive integer, got {value}"),
        ))
    }
}

/// Parse an environment value as a positive integer.
fn parse_positive(name: &str, raw: &str) -> Result<i64> {
    let value: i64 = raw.trim().parse().map_err(|_| {
        SessionError::invalid_parameter(name, format!("expected a positive integer, got {raw:?}"))
    })?;
    positive(name, value)?;
    Ok(value)
}

impl Config {
    /// Build a configuration from explicit parts, validating the lock
    /// parameters.
    pub fn new(database: DatabaseConfig, locking: LockingConfig) -> Result<Self> {
        locking.validate()?;
        Ok(Self { database, locking })
    }

    /// Load configuration with the full precedence chain, using the current
    /// working directory for the project layer.
    pub fn load() -> Result<Self> {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config()? {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides()?;
                config.locking.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration with a specific working directory.
    ///
    /// A missing file at any layer is skipped. A file that exists but does
    /// not parse is an error, as is an invalid lock parameter at any layer.
    pub fn load_from_cwd(cwd: &Path) -> Result<Self> {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config()? {
            config = config.merge(user_config);
        }

        let project_path = project_config_path(cwd);
        if project_path.exists() {
            config = config.merge(Self::load_from_file(&project_path)?);
        }

        config.apply_env_overrides()?;
        config.locking.validate()?;

        tracing::debug!(
            table = %config.database.table,
            locking = config.locking.enabled,
            mode = %config.locking.mode,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load user config from `~/.sessiondb/config.toml`, if present.
    fn load_user_config() -> Result<Option<Config>> {
        let Some(home) = sessiondb_home() else {
            return Ok(None);
        };
        let config_path = home.join("config.toml");
        if !config_path.exists() {
            return Ok(None);
        }
        Self::load_from_file(&config_path).map(Some)
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| SessionError::storage(path, e))?;
        toml::from_str(&content)
            .map_err(|e| SessionError::config(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("SESSIONDB_DATABASE") {
            self.database.name = val;
        }
        if let Ok(val) = env::var("SESSIONDB_HOST") {
            self.database.host = val;
        }
        if let Ok(val) = env::var("SESSIONDB_USER") {
            self.database.user = val;
        }
        if let Ok(val) = env::var("SESSIONDB_PASSWORD") {
            self.database.password = Some(val);
        }
        if let Ok(val) = env::var("SESSIONDB_TABLE") {
            self.database.table = val;
        }

        if let Ok(val) = env::var("SESSIONDB_LOCK_ENABLED") {
            self.locking.enabled = val == "true" || val == "1";
        }
        if let Ok(val) = env::var("SESSIONDB_LOCK_SLEEP") {
            self.locking.sleep_seconds = parse_positive("SESSIONDB_LOCK_SLEEP", &val)?;
        }
        if let Ok(val) = env::var("SESSIONDB_LOCK_TIMEOUT") {
            self.locking.timeout_seconds = parse_positive("SESSIONDB_LOCK_TIMEOUT", &val)?;
        }
        if let Ok(val) = env::var("SESSIONDB_LOCK_MODE") {
            self.locking.mode = val.parse()?;
        }
        if let Ok(val) = env::var("SESSIONDB_LOCK_ON_TIMEOUT") {
            self.locking.on_timeout = val.parse()?;
        }
        Ok(())
    }

    /// Merge another config into this one.
    ///
    /// Non-default fields of `other` win, field by field. As with any
    /// default-comparison merge, a layer cannot reset a value back to its
    /// default once a lower layer changed it.
    fn merge(mut self, other: Config) -> Self {
        let default_db = DatabaseConfig::default();
        if other.database.name != default_db.name {
            self.database.name = other.database.name;
        }
        if other.database.host != default_db.host {
            self.database.host = other.database.host;
        }
        if other.database.user != default_db.user {
            self.database.user = other.database.user;
        }
        if other.database.password.is_some() {
            self.database.password = other.database.password;
        }
        if other.database.table != default_db.table {
            self.database.table = other.database.table;
        }

        let default_lock = LockingConfig::default();
        if other.locking.enabled != default_lock.enabled {
            self.locking.enabled = other.locking.enabled;
        }
        if other.locking.sleep_seconds != default_lock.sleep_seconds {
            self.locking.sleep_seconds = other.locking.sleep_seconds;
        }
        if other.locking.timeout_seconds != default_lock.timeout_seconds {
            self.locking.timeout_seconds = other.locking.timeout_seconds;
        }
        if other.locking.mode != default_lock.mode {
            self.locking.mode = other.locking.mode;
        }
        if other.locking.on_timeout != default_lock.on_timeout {
            self.locking.on_timeout = other.locking.on_timeout;
        }

        self
    }

    /// Check the parameters every store operation depends on.
    ///
    /// Database name, table name and user must be non-empty, the table
    /// name must consist of word characters only, and both lock intervals
    /// must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.database.name.is_empty() {
            return Err(SessionError::config("database name is not set"));
        }
        if self.database.user.is_empty() {
            return Err(SessionError::config("database user is not set"));
        }
        validate_table_name(&self.database.table)?;
        self.locking.validate()
    }

    /// Save configuration to the project config file.
    ///
    /// Writes `.sessiondb/config.toml` under `cwd` through a temp file and
    /// rename.
    pub fn save_project(&self, cwd: &Path) -> Result<PathBuf> {
        let dir = project_config_dir(cwd);
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| SessionError::storage(&dir, e))?;
        }

        let config_path = dir.join("config.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| SessionError::serde(e.to_string()))?;

        let temp_path = dir.join(".config.toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| SessionError::storage(&temp_path, e))?;
        let file = fs::File::open(&temp_path).map_err(|e| SessionError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| SessionError::storage(&temp_path, e))?;
        drop(file);
        fs::rename(&temp_path, &config_path).map_err(|e| SessionError::storage(&config_path, e))?;

        Ok(config_path)
    }
}

/// Get the sessiondb home directory.
///
/// Checks `SESSIONDB_HOME` first, then falls back to `~/.sessiondb`. An
/// empty `SESSIONDB_HOME` is ignored.
pub fn sessiondb_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("SESSIONDB_HOME") {
        if home.is_empty() {
            tracing::warn!("SESSIONDB_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("SESSIONDB_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".sessiondb"));
    }

    let fallback_path = fallback_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

#[cfg(unix)]
fn fallback_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/sessiondb-{}", uid))
}

#[cfg(not(unix))]
fn fallback_home() -> PathBuf {
    std::env::temp_dir().join("sessiondb")
}

/// Project config directory: `<cwd>/.sessiondb/`.
pub fn project_config_dir(cwd: &Path) -> PathBuf {
    cwd.join(".sessiondb")
}

/// Project config file: `<cwd>/.sessiondb/config.toml`.
pub fn project_config_path(cwd: &Path) -> PathBuf {
    project_config_dir(cwd).join("config.toml")
}

/// Default SQLite database file: `<home>/sessions.db`.
pub fn default_database_path() -> Option<PathBuf> {
    sessiondb_home().map(|h| h.join("sessions.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const LOCK_VARS: &[&str] = &[
        "SESSIONDB_LOCK_ENABLED",
        "SESSIONDB_LOCK_SLEEP",
        "SESSIONDB_LOCK_TIMEOUT",
        "SESSIONDB_LOCK_MODE",
        "SESSIONDB_LOCK_ON_TIMEOUT",
    ];

    fn clear_lock_vars() {
        for var in LOCK_VARS {
            env::remove_var(var);
        }
    }

    fn isolated_home() -> TempDir {
        let home = TempDir::new().unwrap();
        env::set_var("SESSIONDB_HOME", home.path());
        home
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.database.name.is_empty());
        assert!(config.database.user.is_empty());
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.table, "sessions");
        assert!(config.database.password.is_none());

        assert!(config.locking.enabled);
        assert_eq!(config.locking.sleep_seconds, 1);
        assert_eq!(config.locking.timeout_seconds, 15);
        assert_eq!(config.locking.mode, LockMode::Advisory);
        assert_eq!(config.locking.on_timeout, TimeoutPolicy::Proceed);
    }

    #[test]
    fn test_locking_new_rejects_non_positive() {
        assert!(LockingConfig::new(true, 1, 15).is_ok());

        let err = LockingConfig::new(true, 0, 15).unwrap_err();
        assert!(matches!(err, SessionError::InvalidParameter { .. }));
        assert!(err.to_string().contains("locking.sleep_seconds"));

        let err = LockingConfig::new(true, 1, -3).unwrap_err();
        assert!(matches!(err, SessionError::InvalidParameter { .. }));
        assert!(err.to_string().contains("locking.timeout_seconds"));
    }

    #[test]
    fn test_config_new_validates_locking() {
        let locking = LockingConfig {
            sleep_seconds: 0,
            ..LockingConfig::default()
        };
        let result = Config::new(DatabaseConfig::default(), locking);
        assert!(matches!(result, Err(SessionError::InvalidParameter { .. })));
    }

    #[test]
    fn test_validate_requires_name_user_table() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(SessionError::Config { .. })));

        config.database.name = "sessions.db".to_string();
        assert!(matches!(config.validate(), Err(SessionError::Config { .. })));

        config.database.user = "web".to_string();
        assert!(config.validate().is_ok());

        config.database.table = String::new();
        assert!(matches!(config.validate(), Err(SessionError::Config { .. })));

        config.database.table = "sess; DROP TABLE x".to_string();
        assert!(matches!(config.validate(), Err(SessionError::Config { .. })));
    }

    #[test]
    fn test_validate_checks_literal_locking() {
        let mut config = Config::default();
        config.database.name = "sessions.db".to_string();
        config.database.user = "web".to_string();

        config.locking.sleep_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidParameter { .. })
        ));
        assert_eq!(config.locking.sleep_secs(), 0);

        config.locking.sleep_seconds = 1;
        config.locking.timeout_seconds = -5;
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidParameter { .. })
        ));
        assert_eq!(config.locking.timeout_secs(), 0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[database]
name = "/var/lib/app/sessions.db"
user = "web"
table = "sess"

[locking]
sleep_seconds = 2
timeout_seconds = 30
mode = "atomic"
on_timeout = "fail"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.database.name, "/var/lib/app/sessions.db");
        assert_eq!(config.database.user, "web");
        assert_eq!(config.database.table, "sess");
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.locking.sleep_seconds, 2);
        assert_eq!(config.locking.timeout_seconds, 30);
        assert_eq!(config.locking.mode, LockMode::Atomic);
        assert_eq!(config.locking.on_timeout, TimeoutPolicy::Fail);
        assert!(config.locking.enabled);
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(SessionError::Storage { .. })));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = Config::load_from_file(&config_path);
        assert!(matches!(result, Err(SessionError::Config { .. })));
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        let _home = isolated_home();
        clear_lock_vars();
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(project_config_dir(dir.path())).unwrap();
        fs::write(
            project_config_path(dir.path()),
            "[locking]\ntimeout_seconds = 7\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path()).unwrap();

        assert_eq!(config.locking.timeout_seconds, 7);
        assert_eq!(config.locking.sleep_seconds, 1);

        env::remove_var("SESSIONDB_HOME");
    }

    #[test]
    #[serial]
    fn test_project_overrides_user_config() {
        let home = isolated_home();
        clear_lock_vars();
        fs::write(
            home.path().join("config.toml"),
            "[database]\nname = \"user.db\"\nuser = \"alice\"\n",
        )
        .unwrap();

        let dir = TempDir::new().unwrap();
        fs::create_dir_all(project_config_dir(dir.path())).unwrap();
        fs::write(
            project_config_path(dir.path()),
            "[database]\nname = \"project.db\"\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path()).unwrap();
        assert_eq!(config.database.name, "project.db");
        assert_eq!(config.database.user, "alice");

        env::remove_var("SESSIONDB_HOME");
    }

    #[test]
    #[serial]
    fn test_invalid_sleep_in_file_is_invalid_parameter() {
        let _home = isolated_home();
        clear_lock_vars();
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(project_config_dir(dir.path())).unwrap();
        fs::write(
            project_config_path(dir.path()),
            "[locking]\nsleep_seconds = -1\n",
        )
        .unwrap();

        let result = Config::load_from_cwd(dir.path());
        assert!(matches!(result, Err(SessionError::InvalidParameter { .. })));

        env::remove_var("SESSIONDB_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        let _home = isolated_home();
        clear_lock_vars();
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(project_config_dir(dir.path())).unwrap();
        fs::write(
            project_config_path(dir.path()),
            "[locking]\ntimeout_seconds = 7\n",
        )
        .unwrap();

        env::set_var("SESSIONDB_LOCK_TIMEOUT", "10");
        let config = Config::load_from_cwd(dir.path()).unwrap();
        assert_eq!(config.locking.timeout_seconds, 10);

        env::remove_var("SESSIONDB_LOCK_TIMEOUT");
        env::remove_var("SESSIONDB_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        env::set_var("SESSIONDB_DATABASE", "env.db");
        env::set_var("SESSIONDB_HOST", "db.internal");
        env::set_var("SESSIONDB_USER", "svc");
        env::set_var("SESSIONDB_PASSWORD", "hunter2");
        env::set_var("SESSIONDB_TABLE", "web_sessions");
        env::set_var("SESSIONDB_LOCK_ENABLED", "false");
        env::set_var("SESSIONDB_LOCK_SLEEP", "2");
        env::set_var("SESSIONDB_LOCK_TIMEOUT", "20");
        env::set_var("SESSIONDB_LOCK_MODE", "atomic");
        env::set_var("SESSIONDB_LOCK_ON_TIMEOUT", "fail");

        let mut config = Config::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.database.name, "env.db");
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.user, "svc");
        assert_eq!(config.database.password.as_deref(), Some("hunter2"));
        assert_eq!(config.database.table, "web_sessions");
        assert!(!config.locking.enabled);
        assert_eq!(config.locking.sleep_seconds, 2);
        assert_eq!(config.locking.timeout_seconds, 20);
        assert_eq!(config.locking.mode, LockMode::Atomic);
        assert_eq!(config.locking.on_timeout, TimeoutPolicy::Fail);

        for var in [
            "SESSIONDB_DATABASE",
            "SESSIONDB_HOST",
            "SESSIONDB_USER",
            "SESSIONDB_PASSWORD",
            "SESSIONDB_TABLE",
        ] {
            env::remove_var(var);
        }
        clear_lock_vars();
    }

    #[test]
    #[serial]
    fn test_env_var_rejects_bad_intervals() {
        clear_lock_vars();
        for bad in ["0", "-5", "1.5", "soon"] {
            env::set_var("SESSIONDB_LOCK_SLEEP", bad);
            let mut config = Config::default();
            let err = config.apply_env_overrides().unwrap_err();
            assert!(
                matches!(err, SessionError::InvalidParameter { .. }),
                "value {bad:?} should be rejected"
            );
        }
        clear_lock_vars();
    }

    #[test]
    #[serial]
    fn test_env_var_rejects_unknown_mode() {
        clear_lock_vars();
        env::set_var("SESSIONDB_LOCK_MODE", "exclusive");
        let mut config = Config::default();
        assert!(matches!(
            config.apply_env_overrides(),
            Err(SessionError::InvalidParameter { .. })
        ));
        clear_lock_vars();
    }

    #[test]
    fn test_merge_configs() {
        let base = Config::default();
        let other = Config {
            locking: LockingConfig {
                timeout_seconds: 60,
                ..LockingConfig::default()
            },
            ..Config::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.locking.timeout_seconds, 60);
        assert_eq!(merged.locking.sleep_seconds, 1);
        assert_eq!(merged.database.table, "sessions");
    }

    #[test]
    fn test_save_project_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.database.name = "app.db".to_string();
        config.database.user = "web".to_string();
        config.locking.mode = LockMode::Atomic;

        let path = config.save_project(dir.path()).unwrap();
        assert_eq!(path, project_config_path(dir.path()));
        assert!(!project_config_dir(dir.path()).join(".config.toml.tmp").exists());

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn test_sessiondb_home_with_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("SESSIONDB_HOME", dir.path().to_str().unwrap());

        let home = sessiondb_home().unwrap();
        assert_eq!(home, dir.path());
        assert_eq!(default_database_path().unwrap(), dir.path().join("sessions.db"));

        env::remove_var("SESSIONDB_HOME");
    }

    #[test]
    #[serial]
    fn test_sessiondb_home_empty_env_falls_back() {
        env::set_var("SESSIONDB_HOME", "");
        let home = sessiondb_home().unwrap();
        assert!(home.ends_with(".sessiondb") || home.to_string_lossy().contains("sessiondb"));
        env::remove_var("SESSIONDB_HOME");
    }

    #[test]
    fn test_mode_and_policy_parse() {
        assert_eq!("advisory".parse::<LockMode>().unwrap(), LockMode::Advisory);
        assert_eq!("atomic".parse::<LockMode>().unwrap(), LockMode::Atomic);
        assert_eq!("proceed".parse::<TimeoutPolicy>().unwrap(), TimeoutPolicy::Proceed);
        assert_eq!("fail".parse::<TimeoutPolicy>().unwrap(), TimeoutPolicy::Fail);
        assert!("maybe".parse::<TimeoutPolicy>().is_err());
        assert_eq!(LockMode::Atomic.to_string(), "atomic");
    }
}
