use thiserror::Error;

/// Column whose unique constraint rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("duplicate {0:?}")]
    Duplicate(UniqueField),
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Db(String),
}
