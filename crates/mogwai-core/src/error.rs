//! Error types for Mogwai
//!
//! Provides the error hierarchy for IR construction, translation, binding
//! and execution.

use thiserror::Error;

/// The main error type for Mogwai operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ========== IR Construction Errors ==========
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Ownership error: {0}")]
    Ownership(String),

    // ========== Source Language Errors ==========
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Translation error at {node}: {message}")]
    Translation { node: String, message: String },

    // ========== Binding and Execution Errors ==========
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Result mapping error: {0}")]
    ResultMapping(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Mogwai operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a translation error for the given source node
    pub fn translation<N: std::fmt::Display, M: Into<String>>(node: N, message: M) -> Self {
        Error::Translation {
            node: node.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if this error comes from an illegal IR mutation
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Error::Structural(_) | Error::Ownership(_))
    }

    /// Returns true if this error is raised before any store I/O happens
    pub fn is_static(&self) -> bool {
        !self.is_store_failure()
    }

    /// Returns true if this error was surfaced while talking to a store
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::Execution(_) | Error::ResultMapping(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnboundVariable("z".to_string());
        assert_eq!(err.to_string(), "Unbound variable: z");

        let err = Error::translation("if true then 1 else 2 endif", "no lowering rule");
        assert_eq!(
            err.to_string(),
            "Translation error at if true then 1 else 2 endif: no lowering rule"
        );
    }

    #[test]
    fn test_error_construction() {
        assert!(Error::Structural("sealed".to_string()).is_construction_error());
        assert!(Error::Ownership("owned".to_string()).is_construction_error());
        assert!(!Error::Execution("down".to_string()).is_construction_error());
    }

    #[test]
    fn test_error_static_vs_store() {
        assert!(Error::UnboundVariable("x".to_string()).is_static());
        assert!(Error::translation("x", "y").is_static());
        assert!(Error::Execution("backend unavailable".to_string()).is_store_failure());
        assert!(Error::ResultMapping("42".to_string()).is_store_failure());
        assert!(!Error::ResultMapping("42".to_string()).is_static());
    }
}
