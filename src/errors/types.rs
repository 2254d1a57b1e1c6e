//! Error types for the popup notifier
//!
//! This module defines the error conditions that can surface outside the
//! dispatcher, with enough context to log them usefully.

use std::path::PathBuf;
use thiserror::Error;

use crate::bus::BusError;
use crate::popup::DispatchError;

/// Main application error type
///
/// Organized by functional domain. Failures of a single notification never
/// take the service down; these errors reach the caller that issued the
/// operation.
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Bus errors
    #[error("Notification bus error: {message}")]
    Bus {
        message: String,
        #[source]
        source: Option<BusError>,
    },

    // Dispatch errors
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    // Service errors
    #[error("Notification service is not running")]
    ServiceStopped,

    // I/O errors
    #[error("File I/O error for '{path}': {operation}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Serialization errors
    #[error("TOML parsing error: {context}")]
    TomlParsing {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("TOML serialization error: {context}")]
    TomlSerialization {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // System and process errors
    #[error("Process execution failed: {command}")]
    ProcessExecution {
        command: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Generic/catch-all errors
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a new Config error with context
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new Config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new I/O error with source
    pub fn io_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new ProcessExecution error with source
    pub fn process_with_source(
        command: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ProcessExecution {
            command: command.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Bus { .. } => "bus",
            Self::Dispatch(_) => "dispatch",
            Self::ServiceStopped => "service",
            Self::Io { .. } => "io",
            Self::TomlParsing { .. } | Self::TomlSerialization { .. } => "serialization",
            Self::ProcessExecution { .. } => "system",
            Self::Other { .. } => "internal",
        }
    }
}

impl From<BusError> for AppError {
    fn from(err: BusError) -> Self {
        Self::Bus {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let operation = match err.kind() {
            std::io::ErrorKind::NotFound => "file not found",
            std::io::ErrorKind::PermissionDenied => "permission denied",
            _ => "I/O operation",
        }
        .to_string();

        Self::Io {
            path: PathBuf::from("unknown"),
            operation,
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParsing {
            context: err.message().to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        Self::TomlSerialization {
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationId;

    #[test]
    fn test_error_creation() {
        let err = AppError::config("test config error");
        assert_eq!(err.to_string(), "Configuration error: test config error");
    }

    #[test]
    fn test_error_category() {
        assert_eq!(AppError::config("test").category(), "config");
        assert_eq!(AppError::from(BusError::Disconnected).category(), "bus");
        assert_eq!(
            AppError::from(DispatchError::NothingToUpdate(NotificationId(1))).category(),
            "dispatch"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();

        match app_err {
            AppError::Io { operation, .. } => {
                assert_eq!(operation, "file not found");
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<crate::shared::config::Config>("app = 3").unwrap_err();
        let app_err: AppError = toml_err.into();
        assert_eq!(app_err.category(), "serialization");
    }
}
