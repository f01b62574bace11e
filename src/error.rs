//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failures that can occur when talking to the
//! instrument, from handle acquisition to response parsing.
//!
//! ## Error Hierarchy
//!
//! - **`Connection`**: the transport handle could not be acquired (bad
//!   resource name, VISA library failure, instrument not present).
//! - **`IdentityMismatch`**: the device answered `*IDN?` but is not the
//!   instrument we expected to find.
//! - **`InvalidChannel`**: the caller used a channel id the device does not
//!   have. Raised before any transport I/O happens.
//! - **`Transport`**: a query or write failed after the connection was
//!   established.
//! - **`NotConnected`**: an operation was attempted on a closed session.
//! - **`Parse`**: the device responded, but not with a parseable number.
//! - **`Config`**: wraps errors from the `config` crate, typically file
//!   parsing or format issues in the configuration files.
//!
//! By using `#[from]`, `DaqError` can be seamlessly created from underlying
//! error types, simplifying error handling throughout the application with
//! the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

#[derive(Error, Debug)]
pub enum DaqError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected instrument identity: expected '{expected}', got '{actual}'")]
    IdentityMismatch { expected: String, actual: String },

    #[error("Invalid channel id {0} (recognized channels: 0, 1)")]
    InvalidChannel(u8),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Instrument session is not connected")]
    NotConnected,

    #[error("Failed to parse instrument response '{response}' as a number")]
    Parse {
        response: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaqError::Transport("query timed out".to_string());
        assert_eq!(err.to_string(), "Transport error: query timed out");
    }

    #[test]
    fn test_identity_mismatch_display() {
        let err = DaqError::IdentityMismatch {
            expected: "OIC,Embedded SCPI Example,1,10".to_string(),
            actual: "ACME,Toaster,0,1".to_string(),
        };
        assert!(err.to_string().contains("OIC,Embedded SCPI Example,1,10"));
        assert!(err.to_string().contains("ACME,Toaster,0,1"));
    }

    #[test]
    fn test_invalid_channel_display() {
        assert_eq!(
            DaqError::InvalidChannel(7).to_string(),
            "Invalid channel id 7 (recognized channels: 0, 1)"
        );
    }
}
