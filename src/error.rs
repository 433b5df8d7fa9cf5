use thiserror::Error;

/// Errors surfaced by query construction, translation, mapping and execution.
///
/// None of these are retried by the engine; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A search condition is malformed or contradicts itself, e.g. a lower bound above the
    /// upper bound.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The requested combination of clauses cannot be expressed as a single statement.
    #[error("unsupported query shape: {0}")]
    UnsupportedQueryShape(String),

    /// The projection target cannot be populated from the selected expressions.
    #[error("projection binding failed: {0}")]
    ProjectionBinding(String),

    /// Anything reported by the underlying driver, passed through unchanged.
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn invalid_condition(message: impl Into<String>) -> Self {
        Self::InvalidCondition(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedQueryShape(message.into())
    }

    pub(crate) fn binding(message: impl Into<String>) -> Self {
        Self::ProjectionBinding(message.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
