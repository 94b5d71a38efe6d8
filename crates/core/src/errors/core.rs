use thiserror::Error;

/// Core error type for the keel framework
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CoreError {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Check if the error is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_helper() {
        let err = CoreError::validation("bad shard");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Validation error: bad shard");
    }
}
