//! Domain-specific errors for the ledger.
//!
//! Contains error variants for common failure cases like:
//! - Account errors (duplicate email, bad credentials, no session)
//! - Ledger rule violations (last category, invalid amounts)
//! - Persistence failures (unreadable stored JSON, I/O, invalid backups)
//!
//! Every variant renders a user-facing message; callers at the CLI boundary
//! print it and carry on.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("an account with this email already exists")]
    DuplicateEmail,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("no account is signed in")]
    NoActiveSession,

    #[error("finish onboarding first")]
    OnboardingRequired,

    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error("cannot delete the last remaining category")]
    CategoryDeletionRejected,

    #[error("{0}")]
    Validation(String),

    #[error("stored value `{key}` could not be parsed: {source}")]
    StorageParseFailure {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value for `{key}` could not be encoded: {source}")]
    StorageEncode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error("insights request failed: {0}")]
    Insights(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_backup(msg: impl Into<String>) -> Self {
        Self::InvalidBackup(msg.into())
    }
}
