//! Error types for biosnav.

use std::time::Duration;
use thiserror::Error;

/// Failures of the console session collaborator.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Timed out after {timeout:?} waiting for {pattern}")]
    Timeout { pattern: String, timeout: Duration },

    #[error("Console connection closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Unsupported hardware: {0}")]
    UnsupportedHardware(String),

    #[error("Console session error: {0}")]
    Session(#[from] SessionError),

    #[error("Unable to determine option to select in {menu}: nothing matches {target}")]
    OptionNotFound { menu: String, target: String },

    #[error("Menu {0} already committed a selection; parse it again before selecting")]
    AlreadySelected(String),

    #[error("Sub-menu not found: {0}")]
    UnknownSubMenu(String),
}

impl MenuError {
    /// Whether this error is a session timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MenuError::Session(SessionError::Timeout { .. }))
    }
}
