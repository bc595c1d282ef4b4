//! Init command for sessiondb.
//!
//! Writes the project configuration and creates the session table.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{default_database_path, project_config_path, Config};
use crate::error::{exit_code_for, exit_codes, Result, SessionError};
use crate::storage::sqlite::MEMORY_DATABASE;
use crate::storage::SqliteDatastore;

/// Database user written into a fresh project config.
pub const DEFAULT_USER: &str = "sessiondb";

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Overwrite an existing project config.
    pub force: bool,
}

/// Output format for the init command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutput {
    /// Whether initialization was successful.
    pub success: bool,
    /// Files and directories created.
    pub created: Vec<String>,
    /// Files that already existed (skipped).
    pub skipped: Vec<String>,
    /// Database the session table lives in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Name of the session table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this outcome.
    pub exit_code: i32,
}

impl InitOutput {
    /// Create a successful output.
    pub fn success(created: Vec<String>, skipped: Vec<String>, config: &Config) -> Self {
        Self {
            success: true,
            created,
            skipped,
            database: Some(config.database.name.clone()),
            table: Some(config.database.table.clone()),
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output with partial success information.
    pub fn failure(err: &SessionError, created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: false,
            created,
            skipped,
            database: None,
            table: None,
            error: Some(err.to_string()),
            exit_code: exit_code_for(err),
        }
    }
}

/// The init command implementation.
pub struct InitCommand {
    cwd: PathBuf,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Run the init command.
    pub fn run(&self, options: &InitOptions) -> InitOutput {
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        let config_path = project_config_path(&self.cwd);
        if config_path.exists() && !options.force {
            skipped.push(config_path.display().to_string());
        } else {
            match self.write_project_config(&config_path, options.force) {
                Ok(path) => created.push(path.display().to_string()),
                Err(e) => return InitOutput::failure(&e, created, skipped),
            }
        }

        // Env overrides apply to the table we create, not to the file.
        let config = match Config::load_from_cwd(&self.cwd) {
            Ok(config) => config,
            Err(e) => return InitOutput::failure(&e, created, skipped),
        };

        match Self::ensure_database_dir(&config) {
            Ok(Some(dir)) => created.push(dir.display().to_string()),
            Ok(None) => {}
            Err(e) => return InitOutput::failure(&e, created, skipped),
        }

        let config = Arc::new(config);
        if let Err(e) = SqliteDatastore::new(Arc::clone(&config)).ensure_schema() {
            return InitOutput::failure(&e, created, skipped);
        }

        tracing::info!(
            database = %config.database.name,
            table = %config.database.table,
            "session table ready"
        );
        InitOutput::success(created, skipped, &config)
    }

    /// Write the project config, keeping any values already in the file.
    fn write_project_config(&self, path: &Path, force: bool) -> Result<PathBuf> {
        let mut config = if path.exists() && force {
            Config::load_from_file(path).unwrap_or_default()
        } else {
            Config::default()
        };

        if config.database.name.is_empty() {
            config.database.name = default_database_path()
                .map(|p| p.display().to_string())
                .ok_or_else(|| SessionError::config("cannot determine a default database path"))?;
        }
        if config.database.user.is_empty() {
            config.database.user = DEFAULT_USER.to_string();
        }

        config.save_project(&self.cwd)
    }

    /// Create the directory holding the database file.
    /// Returns the directory if it was created.
    fn ensure_database_dir(config: &Config) -> Result<Option<PathBuf>> {
        if config.database.name == MEMORY_DATABASE {
            return Ok(None);
        }
        let Some(dir) = Path::new(&config.database.name).parent() else {
            return Ok(None);
        };
        if dir.as_os_str().is_empty() || dir.exists() {
            return Ok(None);
        }
        fs::create_dir_all(dir).map_err(|e| SessionError::storage(dir, e))?;
        Ok(Some(dir.to_path_buf()))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &InitOutput) -> String {
        let mut lines = Vec::new();

        if !output.success {
            lines.push(format!(
                "Init failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ));
            if !output.created.is_empty() {
                lines.push(String::new());
                lines.push("Partially created before failure:".to_string());
                for path in &output.created {
                    lines.push(format!("  {}", path));
                }
            }
            return lines.join("\n") + "\n";
        }

        if !output.created.is_empty() {
            lines.push("Created:".to_string());
            for path in &output.created {
                lines.push(format!("  {}", path));
            }
        }

        if !output.skipped.is_empty() {
            lines.push("Already exists (skipped):".to_string());
            for path in &output.skipped {
                lines.push(format!("  {}", path));
            }
        }

        if let (Some(database), Some(table)) = (&output.database, &output.table) {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("Session table {} ready in {}", table, database));
        }

        lines.join("\n") + "\n"
    }
}
