//! Domain error model.

use thiserror::Error;

use crate::entity::Entity;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic business failures only. Stock shortages are detected by the
/// store inside a transaction and live in the infrastructure error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input (empty name, negative price, qpk < 1).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A kit rule was broken (e.g. stock on a kit without components).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Names the record kind, not the id.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Collides with existing state (duplicate SKU, item already in the kit).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found<E: Entity>() -> Self {
        Self::NotFound(E::KIND)
    }

    /// True for failures caused by the caller's input rather than state.
    pub fn is_input_error(&self) -> bool {
        matches!(self, DomainError::Validation(_) | DomainError::InvalidId(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shelf;

    impl Entity for Shelf {
        const KIND: &'static str = "shelf";
        type Id = u8;

        fn id(&self) -> u8 {
            1
        }
    }

    #[test]
    fn not_found_names_the_kind() {
        let err = DomainError::not_found::<Shelf>();
        assert_eq!(err, DomainError::NotFound("shelf"));
        assert_eq!(err.to_string(), "shelf not found");
    }

    #[test]
    fn input_errors_are_told_apart_from_state_errors() {
        assert!(DomainError::validation("x").is_input_error());
        assert!(DomainError::invalid_id("x").is_input_error());
        assert!(!DomainError::invariant("x").is_input_error());
        assert!(!DomainError::conflict("x").is_input_error());
    }
}
