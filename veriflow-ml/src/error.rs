//! Error types for the veriflow-ml crate.

use thiserror::Error;

/// Top-level error type for collaborator operations.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Feature error: {0}")]
    Feature(String),

    #[error("Rule error: {0}")]
    Rule(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl MlError {
    pub fn feature(msg: impl Into<String>) -> Self {
        Self::Feature(msg.into())
    }

    pub fn rule(msg: impl Into<String>) -> Self {
        Self::Rule(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            MlError::feature("column empty").to_string(),
            "Feature error: column empty"
        );
        assert_eq!(
            MlError::rule("id column missing").to_string(),
            "Rule error: id column missing"
        );
        assert_eq!(
            MlError::invalid_input("contamination out of range").to_string(),
            "Invalid input: contamination out of range"
        );
    }
}
