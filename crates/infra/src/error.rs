use thiserror::Error;

use eventrent_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store, service, workflow or portal call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unknown id, or a portal token that does not open the booking.
    #[error("not found")]
    NotFound,

    /// The current status does not allow the requested transition.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An input value was malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The in-memory state lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => StoreError::NotFound,
            DomainError::InvalidState(msg) => StoreError::InvalidState(msg),
            DomainError::Validation(msg) => StoreError::Validation(msg),
            DomainError::InvalidId(msg) => StoreError::Validation(msg),
        }
    }
}

impl StoreError {
    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound => "not_found",
            StoreError::InvalidState(_) => "invalid_state",
            StoreError::Validation(_) => "validation",
            StoreError::Poisoned => "poisoned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_one_to_one() {
        assert_eq!(StoreError::from(DomainError::NotFound), StoreError::NotFound);
        assert_eq!(
            StoreError::from(DomainError::invalid_state("quote is not signed")),
            StoreError::InvalidState("quote is not signed".to_string())
        );
        assert_eq!(
            StoreError::from(DomainError::invalid_id("bad uuid")),
            StoreError::Validation("bad uuid".to_string())
        );
    }
}
