//! Domain-specific error types for the Cynosure portal

use thiserror::Error;

/// Main error type for catalog, store and export operations
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Event catalog error: {message}")]
    Catalog { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Store conflict: expected revision {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Name not found: {name}. Ask an admin to add you to an event first")]
    UnknownParticipant { name: String },

    #[error("Incorrect admin password")]
    InvalidPassword,

    #[error("Unknown event: {message}")]
    UnknownEvent { message: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for PortalError {
    fn from(err: anyhow::Error) -> Self {
        PortalError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::Store {
            message: format!("I/O failed: {}", err),
        }
    }
}

impl From<csv::Error> for PortalError {
    fn from(err: csv::Error) -> Self {
        PortalError::Export {
            message: format!("CSV write failed: {}", err),
        }
    }
}

impl From<toml::de::Error> for PortalError {
    fn from(err: toml::de::Error) -> Self {
        PortalError::Config {
            message: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for PortalError {
    fn from(err: chrono::ParseError) -> Self {
        PortalError::Validation {
            message: format!("Date parsing error: {}", err),
        }
    }
}

/// Result type alias for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;
