//! Error types shared by the library

use thiserror::Error;

/// Rejections raised by the settings editor before anything is persisted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Account number is required")]
    MissingAccountNumber,

    #[error("Account number must be 12 digits or in the form xxxx-xxxx-xxxx: {0}")]
    InvalidAccountNumber(String),

    #[error("Display name is required")]
    MissingDisplayName,

    #[error("Display name must be at most {max} characters (got {len})")]
    DisplayNameTooLong { len: usize, max: usize },

    #[error("Role name is required")]
    MissingRoleName,

    #[error("Unrecognised color: {0}")]
    InvalidColor(String),

    #[error("Watermark opacity must be between 0 and 1 (got {0})")]
    InvalidOpacity(f64),

    #[error("Watermark size must be greater than 0 (got {0})")]
    InvalidSize(u32),
}

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid settings file: {0}")]
    ImportFormat(String),

    #[error("Settings store unavailable: {0}")]
    StoreAccess(String),

    #[error("No listener for message: {0}")]
    Messaging(String),

    #[error("Position cache error: {0}")]
    PositionCache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
