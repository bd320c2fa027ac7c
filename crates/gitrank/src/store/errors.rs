use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur during snapshot store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A field name outside the updatable whitelist.
    #[error("Unknown field: {field} (expected one of {expected})")]
    UnknownField {
        field: String,
        expected: &'static str,
    },
}

impl StoreError {
    pub fn unknown_field(field: &str, expected: &'static str) -> Self {
        Self::UnknownField {
            field: field.to_string(),
            expected,
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
