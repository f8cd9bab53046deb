//! Centralized error types for OOOasis.
//!
//! Every failure the command line can report maps onto one `AppError`
//! variant, which carries both a user-facing message and the process exit
//! code.

use thiserror::Error;

/// Top-level application error type.
///
/// Crate-specific errors (`ConfigError`, `AuthError`, the calendar crate's
/// `CalendarError`) convert into this type at the command boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Calendar API error: {0}")]
    Api(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Returns a short, actionable hint to print after the error itself.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Usage(_) => "Run with --help to see the available options.",
            AppError::Config(e) => e.user_message(),
            AppError::Auth(e) => e.user_message(),
            AppError::Validation(_) => "Check the dates: the start date must be before the end date.",
            AppError::Api(_) => "The calendar request failed. Please try again.",
            AppError::Conflict(_) => "Nothing was changed.",
            AppError::Io(_) => "A file or console operation failed.",
        }
    }

    /// Process exit code for this error. Success is always 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Io(_) => 1,
            AppError::Usage(_) => 2,
            AppError::Config(_) => 3,
            AppError::Auth(_) => 4,
            AppError::Validation(_) => 5,
            AppError::Api(_) => 6,
            AppError::Conflict(_) => 7,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Create a config.ini or pass --config.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::Parse(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Authentication errors (OAuth, tokens, credentials).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Client secrets unavailable: {0}")]
    ClientSecrets(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("Access was denied: {0}")]
    ConsentDenied(String),

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("Token storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::ClientSecrets(_) => {
                "Download the OAuth client file from the Google Cloud console as client_secret.json."
            }
            AuthError::RefreshFailed(_) => "Your session has expired. Please sign in again.",
            AuthError::OAuthFailed(_) => "Sign-in failed. Please try again.",
            AuthError::ConsentDenied(_) => "Sign-in was cancelled.",
            AuthError::StateMismatch => "Sign-in response did not match the request. Please try again.",
            AuthError::StorageError(_) => "Failed to save credentials. Check the token cache path.",
        }
    }
}
