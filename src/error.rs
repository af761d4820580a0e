//! Error types for the store and the LLM collaborator.
//!
//! Errors are classified by what the caller should do with them:
//! - Silent recovery: schema drift and cache corruption reset to defaults
//!   inside the store itself, so they never appear here.
//! - Offline degradation: shared-tier failures come back as `Unavailable`
//!   outcomes, not errors.
//! - User action: storage-full and malformed imports must reach the user.

use thiserror::Error;

/// Errors surfaced by the local cache tier and the import/export paths.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The one local-cache failure that must never be silent: without free
    /// space the latest edits cannot be persisted.
    #[error("Local storage is full: {0}. Export or clean up data to continue.")]
    StorageFull(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Import file rejected; no state was applied.
    #[error("Invalid import file: {0}")]
    InvalidImport(String),
}

impl StoreError {
    /// True when the user has to act before another write can succeed.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            StoreError::StorageFull(_) | StoreError::InvalidImport(_)
        )
    }

    pub fn from_io(err: std::io::Error) -> Self {
        // ENOSPC / quota errors get their own variant so the caller can
        // prompt for cleanup instead of logging and moving on.
        if err.raw_os_error() == Some(28) || format!("{}", err).contains("No space left") {
            StoreError::StorageFull(err.to_string())
        } else {
            StoreError::Io(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialize(err.to_string())
    }
}

/// Errors from the LLM extraction collaborator. All of these are retryable
/// from the user's point of view: the request can simply be re-run.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Network(String),

    #[error("{provider} returned {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Webhook URL is missing from the LLM configuration")]
    MissingEndpoint,

    /// The configured provider name is not one this build can speak to,
    /// e.g. a config synced from a newer build.
    #[error("The configured LLM provider is not supported")]
    UnsupportedProvider,
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        // Configuration problems need a fix first; everything else is
        // transient.
        !matches!(
            self,
            LlmError::MissingEndpoint | LlmError::UnsupportedProvider
        )
    }
}
