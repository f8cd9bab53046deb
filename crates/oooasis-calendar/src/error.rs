//! Calendar-specific error types.

use chrono::NaiveDate;
use oooasis_core::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Start date {start} must be before end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Out of Office event already exists: {0}")]
    AlreadyExists(String),
}

impl CalendarError {
    /// User-friendly error message for terminal display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::Forbidden(_) => "You do not have access to this calendar.".to_string(),
            Self::NotFound(_) => "Event not found".to_string(),
            Self::CalendarNotFound(name) => format!("Calendar '{}' not found.", name),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::Api { message, .. } => format!("Calendar error: {}", message),
            Self::InvalidResponse(_) => "Unexpected response from Google Calendar".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::InvalidRange { .. } => "The start date must be before the end date.".to_string(),
            Self::AlreadyExists(_) => "An Out of Office event already covers these dates.".to_string(),
        }
    }
}

impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::InvalidRange { .. } => AppError::Validation(err.to_string()),
            CalendarError::AlreadyExists(_) => AppError::Conflict(err.to_string()),
            other => AppError::Api(other.to_string()),
        }
    }
}

/// Pull `error.message` out of a Google API error body, falling back to the
/// raw text.
pub(crate) fn api_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Envelope {
        error: Detail,
    }

    #[derive(serde::Deserialize)]
    struct Detail {
        message: String,
    }

    serde_json::from_str::<Envelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
