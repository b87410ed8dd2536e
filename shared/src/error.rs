use thiserror::Error;

use crate::hotkey::Hotkey;

/// Failure reported by a `DisplayServer` implementation.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("cannot connect to display server: {0}")]
    Connection(String),

    #[error("{request} failed: {reason}")]
    Request {
        request: &'static str,
        reason: String,
    },

    #[error("display server lacks required support: {0}")]
    Unsupported(&'static str),

    #[error("hotkey unavailable: {0}")]
    HotkeyUnavailable(String),
}

impl DisplayError {
    pub fn request(request: &'static str, reason: impl ToString) -> Self {
        Self::Request {
            request,
            reason: reason.to_string(),
        }
    }
}

/// Startup failure. Each variant names the step that failed.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("connection failed: {0}")]
    Connect(#[source] DisplayError),

    #[error("window creation failed: {0}")]
    WindowCreation(#[source] DisplayError),

    #[error("click-through setup failed: {0}")]
    ClickThrough(#[source] DisplayError),

    #[error("opacity setup failed: {0}")]
    Opacity(#[source] DisplayError),

    #[error("hotkey registration failed for {hotkey}: {source}")]
    Hotkey {
        hotkey: Hotkey,
        #[source]
        source: DisplayError,
    },

    #[error("initial placement failed: {0}")]
    InitialPlacement(#[source] DisplayError),
}

/// Fatal error while the poll loop is running.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cursor query failed: {0}")]
    CursorQuery(#[source] DisplayError),
}

/// Command-line usage error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Error: Invalid mode '{0}'. Use 'hide' or 'ruler'.")]
    InvalidMode(String),

    #[error("Error: option '{0}' requires a value")]
    MissingValue(String),

    #[error("Error: unknown option '{0}'")]
    UnknownOption(String),
}

impl CliError {
    /// Process exit status for usage errors.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
