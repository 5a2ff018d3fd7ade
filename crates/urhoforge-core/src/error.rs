//! Unified error handling for urhoforge
//!
//! Export code distinguishes three outcomes: a hard failure (this type),
//! a soft skip (`Ok(None)` / `Ok(false)`), and a permissive omission that is
//! only logged. Only the first one travels through `Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all urhoforge operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // ==================== Precondition Errors ====================

    /// A required argument was missing or malformed
    #[error("Invalid argument `{name}`: {message}")]
    InvalidArgument {
        name: String,
        message: String,
    },

    /// Invalid data structure
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    // ==================== Encoding Errors ====================

    /// XML document could not be built or written
    #[error("XML error: {message}")]
    Xml {
        message: String,
    },

    /// Image could not be decoded, encoded or compressed
    #[error("Image encoding failed: {message}")]
    ImageEncode {
        message: String,
    },

    // ==================== Configuration Errors ====================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    // ==================== General Errors ====================

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// External error (from other crates)
    #[error("{0}")]
    External(String),
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

    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Create an XML error
    pub fn xml(message: impl Into<String>) -> Self {
        Error::Xml {
            message: message.into(),
        }
    }

    /// Check if this is a precondition failure (nothing was written)
    pub fn is_precondition(&self) -> bool {
        match self {
            Error::InvalidArgument { .. } => true,
            Error::WithContext { source, .. } => source.is_precondition(),
            _ => false,
        }
    }

    /// Check if this is an I/O error, looking through context wrappers
    pub fn is_io(&self) -> bool {
        match self {
            Error::Io(_) | Error::FileNotFound(_) => true,
            Error::WithContext { source, .. } => source.is_io(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
