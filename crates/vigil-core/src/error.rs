//! Error taxonomy. Every pipeline error is recoverable: the scheduler
//! skips the cycle and retries at the next fire; nothing here is fatal
//! to the engine loop.

use thiserror::Error;

/// All errors produced by the Vigil workspace.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Network failure, timeout, or non-success status from the report source.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The report page's aggregate structure could not be located.
    /// Per-record malformations are warnings, not this.
    #[error("parse failed: {0}")]
    Parse(String),

    /// The notification sink rejected the message or was unreachable.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// Invalid or corrupt configuration (config file or persisted record).
    #[error("config error: {0}")]
    Config(String),

    /// Schedule store read/write failure.
    #[error("store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VigilError>;
