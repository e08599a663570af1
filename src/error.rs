use thiserror::Error;

/// Message shown when the server cannot be reached at all.
pub const CONNECT_FAILED_MESSAGE: &str = "Cannot connect to ERPNext server. Please check the server URL and your internet connection.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Network(String),
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("{0}")]
    Auth(String),
    #[error("{message}")]
    SessionExpired { message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
}

impl AppError {
    /// True when the server rejected the session cookie and a new login is needed.
    #[must_use]
    pub fn needs_auth(&self) -> bool {
        matches!(self, AppError::SessionExpired { .. })
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            AppError::Network(CONNECT_FAILED_MESSAGE.to_string())
        } else if err.is_timeout() {
            AppError::Network("Request timed out. Please try again.".to_string())
        } else if err.is_decode() {
            AppError::Parse(format!("Failed to decode response: {err}"))
        } else if err.is_builder() {
            AppError::Config(format!("Failed to build request: {err}"))
        } else {
            AppError::Network(format!("Unable to reach the server: {err}"))
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("Failed to decode response: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}
