//! Error taxonomy shared by every core subsystem.
//!
//! Most failures are recovered locally (logged and replaced by a safe
//! default). Only API-level rejections surface as `Err`, and only
//! [`CoreError::Fatal`] aborts a frame.

use std::fmt;

use thiserror::Error;

use crate::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The caller may continue; the offending item falls back to a default.
    Recoverable,
    /// The current frame must be abandoned.
    Fatal,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Recoverable => "recoverable",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Invalid UI, role or shader pipeline configuration.
    #[error("config error: {0}")]
    Config(String),
    #[error("asset missing: {what} (entity {entity})")]
    AssetMissing { what: String, entity: Entity },
    /// A call made outside the window in which it is valid.
    #[error("out of contract: {0}")]
    OutOfContract(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl CoreError {
    pub fn severity(&self) -> Severity {
        match self {
            CoreError::Fatal(_) => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
