// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Telefetch download scheduler.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::AccountId;

/// The primary error type used across all Telefetch adapter traits and core operations.
#[derive(Debug, Error)]
pub enum TelefetchError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// File or setting store errors (query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat client errors (search failure, download refused, rate limiting).
    #[error("client error: {message}")]
    Client {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The account is not logged in with the chat client.
    #[error("account {account} is not authorized")]
    Unauthorized { account: AccountId },

    /// A record that was expected to exist is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A download was refused before it reached the client.
    #[error("download rejected: {0}")]
    DownloadRejected(String),

    /// File system errors during transfer.
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Settings blob could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TelefetchError {
    /// Wrap an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TelefetchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a client error without an underlying cause.
    pub fn client(message: impl Into<String>) -> Self {
        TelefetchError::Client {
            message: message.into(),
            source: None,
        }
    }
}
