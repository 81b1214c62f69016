//! Unified error handling for accountd.
//!
//! A `thiserror` enum with a static `error_code()` for metrics labeling
//! and a mapping to the wire-level session error codes clients see.

use thiserror::Error;

/// Errors produced by the core (registry + processor + store).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("credential mismatch")]
    CredentialMismatch,

    #[error("already logged in")]
    AlreadyLoggedIn,

    #[error("account is deleted or blocked")]
    DeletedOrBlocked,

    #[error("too many login attempts")]
    TooManyAttempts,

    #[error("no transition in progress for this account")]
    NoTransitionInProgress,

    #[error("undefined service: {0}")]
    UndefinedService(String),

    #[error("logout rejected: session stuck in transition")]
    LogoutRejected,

    #[error("could not load configuration: {0}")]
    ConfigError(String),
}

impl CoreError {
    /// Static label for metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::StorageError(_) => "storage_error",
            Self::CredentialMismatch => "credential_mismatch",
            Self::AlreadyLoggedIn => "already_logged_in",
            Self::DeletedOrBlocked => "deleted_or_blocked",
            Self::TooManyAttempts => "too_many_attempts",
            Self::NoTransitionInProgress => "no_transition_in_progress",
            Self::UndefinedService(_) => "undefined_service",
            Self::LogoutRejected => "logout_rejected",
            Self::ConfigError(_) => "config_error",
        }
    }

    /// The `SessionStatus.Error` wire code.
    pub fn session_error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "NOT_REGISTERED",
            Self::StorageError(_) => "SYSTEM_ERROR",
            Self::CredentialMismatch => "INCORRECT_PASSWORD",
            Self::AlreadyLoggedIn => "ALREADY_LOGGED_IN",
            Self::DeletedOrBlocked => "DELETED_OR_BLOCKED",
            Self::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            Self::NoTransitionInProgress
            | Self::UndefinedService(_)
            | Self::LogoutRejected
            | Self::ConfigError(_) => "SYSTEM_ERROR",
        }
    }

    /// HTTP status for the REST surface.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) => 404,
            _ => 500,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CoreError::AccountNotFound(String::new()),
            other => CoreError::StorageError(other.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
