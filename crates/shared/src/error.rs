//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Business rule violation.
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Conflict (e.g., duplicate entry).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    ///
    /// Business rule violations are caller errors and map to 400; only
    /// uniqueness collisions use 409.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) | Self::BusinessRule(_) => 400,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Builds an error from a domain error's HTTP status and classification.
    #[must_use]
    pub fn from_status(status: u16, business_rule: bool, message: String) -> Self {
        match status {
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            400..=499 if business_rule => Self::BusinessRule(message),
            400..=499 => Self::Validation(message),
            _ => Self::Internal(message),
        }
    }

    /// Returns true for infrastructure failures whose details must not leak to callers.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

/// A domain error that knows its specific API code and its place in the taxonomy.
pub trait DomainError: std::error::Error {
    /// Specific machine-readable code, e.g. `OVERPAYMENT_REJECTED`.
    fn error_code(&self) -> &'static str;

    /// Classifies the error into the application taxonomy.
    fn classify(&self) -> AppError;
}

impl DomainError for AppError {
    fn error_code(&self) -> &'static str {
        AppError::error_code(self)
    }

    fn classify(&self) -> AppError {
        match self {
            Self::NotFound(m) => Self::NotFound(m.clone()),
            Self::Validation(m) => Self::Validation(m.clone()),
            Self::BusinessRule(m) => Self::BusinessRule(m.clone()),
            Self::Conflict(m) => Self::Conflict(m.clone()),
            Self::Database(m) => Self::Database(m.clone()),
            Self::Internal(m) => Self::Internal(m.clone()),
        }
    }
}
