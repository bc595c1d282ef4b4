//! Session commands for sessiondb: read, write and destroy one session.
//!
//! These drive a [`SessionHandler`] the way a host application would, which
//! makes them useful for inspecting a live table and for scripting.

use serde::{Deserialize, Serialize};

use crate::core::SessionHandler;
use crate::error::{exit_code_for, exit_codes, SessionError};

/// Options shared by the session commands.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Which session operation produced an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionAction {
    Read,
    Write,
    Destroy,
}

/// Output format for the session commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// The operation that ran.
    pub action: SessionAction,
    /// The session identifier.
    pub id: String,
    /// Payload returned by `read`, decoded lossily as UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Payload size in bytes for `read` and `write`.
    pub bytes: usize,
    /// Whether `destroy` removed a row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this outcome.
    pub exit_code: i32,
}

impl SessionOutput {
    fn ok(action: SessionAction, id: &str) -> Self {
        Self {
            success: true,
            action,
            id: id.to_string(),
            data: None,
            bytes: 0,
            removed: None,
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output from the error that caused it.
    pub fn failure(action: SessionAction, id: &str, err: &SessionError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            exit_code: exit_code_for(err),
            ..Self::ok(action, id)
        }
    }
}

/// The session command implementation.
pub struct SessionCommand<H> {
    handler: H,
}

impl<H: SessionHandler> SessionCommand<H> {
    /// Create a session command over a handler.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Read a session. Reading takes the session lock; it is released by
    /// the next write.
    pub fn read(&self, id: &str) -> SessionOutput {
        match self.handler.read(id) {
            Ok(data) => SessionOutput {
                bytes: data.len(),
                data: Some(String::from_utf8_lossy(&data).into_owned()),
                ..SessionOutput::ok(SessionAction::Read, id)
            },
            Err(e) => SessionOutput::failure(SessionAction::Read, id, &e),
        }
    }

    /// Write a session payload.
    pub fn write(&self, id: &str, data: &[u8]) -> SessionOutput {
        match self.handler.write(id, data) {
            Ok(()) => SessionOutput {
                bytes: data.len(),
                ..SessionOutput::ok(SessionAction::Write, id)
            },
            Err(e) => SessionOutput::failure(SessionAction::Write, id, &e),
        }
    }

    /// Destroy a session.
    pub fn destroy(&self, id: &str) -> SessionOutput {
        match self.handler.destroy(id) {
            Ok(removed) => SessionOutput {
                removed: Some(removed),
                ..SessionOutput::ok(SessionAction::Destroy, id)
            },
            Err(e) => SessionOutput::failure(SessionAction::Destroy, id, &e),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SessionOutput, options: &SessionOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            Self::format_human_readable(output)
        }
    }

    fn format_human_readable(output: &SessionOutput) -> String {
        if let Some(error) = &output.error {
            return format!("Error: {}", error);
        }

        match output.action {
            // Raw payload so the output can be piped.
            SessionAction::Read => output.data.clone().unwrap_or_default(),
            SessionAction::Write => format!("Wrote {} byte(s) to {}", output.bytes, output.id),
            SessionAction::Destroy => {
                if output.removed == Some(true) {
                    format!("Destroyed {}", output.id)
                } else {
                    format!("No session {}", output.id)
                }
            }
        }
    }
}
