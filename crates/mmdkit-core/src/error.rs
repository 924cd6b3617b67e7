//! Unified error handling for mmdkit
//!
//! This module provides the error type shared by the scene model,
//! the exporter and the command-line tool.

use thiserror::Error;

/// Unified error type for all mmdkit operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Scene Errors ====================

    /// Object lookup failed
    #[error("Object not found: {name}")]
    ObjectNotFound {
        name: String,
    },

    /// Error reported by the scene host
    #[error("Scene error: {message}")]
    Scene {
        message: String,
    },

    // ==================== Export Errors ====================

    /// Bones were requested but the object has no armature
    #[error("No armature found for object '{object}'")]
    NoArmature {
        object: String,
    },

    /// The bone graph loops back on itself
    #[error("Bone hierarchy contains a cycle at bone '{bone}'")]
    BoneCycle {
        bone: String,
    },

    // ==================== Configuration Errors ====================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    // ==================== General Errors ====================

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if the operation was cancelled rather than failing
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::ObjectNotFound { name: "#3".into() };
        let contextualized = err.with_context("while flattening scene");

        assert!(contextualized.to_string().contains("while flattening scene"));
        assert!(contextualized.to_string().contains("#3"));
    }

    #[test]
    fn test_no_armature_message() {
        let err = Error::NoArmature { object: "Body".into() };
        assert_eq!(err.to_string(), "No armature found for object 'Body'");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::Cancelled.with_context("exporting").is_cancelled());
        assert!(!Error::invalid_config("bad scale").is_cancelled());
    }

    #[test]
    fn test_result_with_context() {
        let result: Result<()> = Err(Error::BoneCycle { bone: "spine".into() });
        let err = result.with_context(|| "writing skeleton".to_string()).unwrap_err();
        assert!(err.to_string().contains("writing skeleton"));
        assert!(err.to_string().contains("spine"));
    }
}
