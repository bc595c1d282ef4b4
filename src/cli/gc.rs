//! GC command for sessiondb.
//!
//! Removes sessions that have not been written within the maximum lifetime.

use serde::{Deserialize, Serialize};

use crate::core::SessionHandler;
use crate::error::{exit_code_for, exit_codes};

/// Options for the gc command.
#[derive(Debug, Clone, Default)]
pub struct GcOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum session lifetime in seconds.
    pub max_lifetime: i64,
}

/// Output format for the gc command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Number of sessions deleted.
    pub removed: u64,
    /// The lifetime that was applied.
    pub max_lifetime_secs: i64,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this outcome.
    pub exit_code: i32,
}

impl GcOutput {
    /// Create a successful output.
    pub fn success(removed: u64, max_lifetime_secs: i64) -> Self {
        Self {
            success: true,
            removed,
            max_lifetime_secs,
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>, max_lifetime_secs: i64, exit_code: i32) -> Self {
        Self {
            success: false,
            removed: 0,
            max_lifetime_secs,
            error: Some(error.into()),
            exit_code,
        }
    }
}

/// The gc command implementation.
pub struct GcCommand<H> {
    handler: H,
}

impl<H: SessionHandler> GcCommand<H> {
    /// Create a new gc command over a handler.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Run the gc command.
    pub fn run(&self, options: &GcOptions) -> GcOutput {
        match self.handler.gc(options.max_lifetime) {
            Ok(removed) => GcOutput::success(removed, options.max_lifetime),
            Err(e) => GcOutput::failure(e.to_string(), options.max_lifetime, exit_code_for(&e)),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &GcOutput, options: &GcOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            Self::format_human_readable(output)
        }
    }

    fn format_human_readable(output: &GcOutput) -> String {
        if !output.success {
            return format!(
                "GC failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.removed == 0 {
            return format!(
                "No sessions older than {}s.",
                output.max_lifetime_secs
            );
        }

        format!(
            "Deleted {} session(s) older than {}s",
            output.removed, output.max_lifetime_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DatabaseConfig, LockingConfig};
    use crate::core::{ManualClock, SessionRecord, SessionStore};
    use crate::storage::MemoryDatastore;
    use chrono::Duration;
    use std::sync::Arc;

    fn setup() -> (
        GcCommand<SessionStore<Arc<MemoryDatastore>, Arc<ManualClock>>>,
        Arc<MemoryDatastore>,
        Arc<ManualClock>,
    ) {
        let config = Arc::new(Config {
            database: DatabaseConfig {
                name: ":memory:".to_string(),
                user: "web".to_string(),
                ..DatabaseConfig::default()
            },
            locking: LockingConfig::default(),
        });
        let datastore = Arc::new(MemoryDatastore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let store = SessionStore::with_clock(config, Arc::clone(&datastore), Arc::clone(&clock));
        (GcCommand::new(store), datastore, clock)
    }

    fn insert_aged(datastore: &MemoryDatastore, clock: &ManualClock, id: &str, age_secs: i64) {
        use crate::core::Clock;
        let modified = clock.now() - Duration::seconds(age_secs);
        datastore
            .insert_raw(SessionRecord::new(id, b"x".to_vec(), modified))
            .unwrap();
    }

    #[test]
    fn test_gc_output_success() {
        let output = GcOutput::success(2, 60);
        assert!(output.success);
        assert_eq!(output.removed, 2);
        assert_eq!(output.exit_code, exit_codes::SUCCESS);
        assert!(output.error.is_none());
    }

    #[test]
    fn test_gc_output_failure() {
        let output = GcOutput::failure("test error", 60, exit_codes::FAILURE);
        assert!(!output.success);
        assert_eq!(output.removed, 0);
        assert_eq!(output.error, Some("test error".to_string()));
    }

    #[test]
    fn test_gc_removes_expired() {
        let (cmd, datastore, clock) = setup();
        insert_aged(&datastore, &clock, "old", 7200);
        insert_aged(&datastore, &clock, "new", 10);

        let output = cmd.run(&GcOptions {
            max_lifetime: 3600,
            ..Default::default()
        });

        assert!(output.success);
        assert_eq!(output.removed, 1);
        assert_eq!(datastore.len(), 1);
    }

    #[test]
    fn test_gc_rejects_zero_lifetime() {
        let (cmd, _, _) = setup();
        let output = cmd.run(&GcOptions::default());
        assert!(!output.success);
        assert_eq!(output.exit_code, exit_codes::INVALID);
    }

    #[test]
    fn test_format_output() {
        let (cmd, _, _) = setup();
        let text = GcOptions {
            max_lifetime: 60,
            ..Default::default()
        };

        assert_eq!(
            cmd.format_output(&GcOutput::success(0, 60), &text),
            "No sessions older than 60s."
        );
        assert_eq!(
            cmd.format_output(&GcOutput::success(3, 60), &text),
            "Deleted 3 session(s) older than 60s"
        );

        let json = GcOptions {
            json: true,
            ..text.clone()
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&GcOutput::success(3, 60), &json)).unwrap();
        assert_eq!(parsed["removed"], 3);

        let quiet = GcOptions { quiet: true, ..text };
        assert!(cmd
            .format_output(&GcOutput::success(3, 60), &quiet)
            .is_empty());
    }
}
