use thiserror::Error;

use crate::store::StoreError;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// The first four variants are conversation-level errors: handlers reply to
/// the user with a corrective message and adjust the session as needed, they
/// are never fatal to the dispatcher.
#[derive(Error, Debug)]
pub enum AppError {
    /// Amount text could not be parsed as a non-negative decimal
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    /// Redeem request exceeds the current bonus balance
    #[error("Insufficient bonus balance: {balance}")]
    InsufficientBalance { balance: f64 },

    /// Operation referenced a phone with no customer record
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Admin reached an amount-entry step without a selected customer
    #[error("Admin session expired")]
    SessionExpired,

    /// Record store errors (Sheets API, configuration)
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
