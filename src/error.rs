//! Error handling module for installkit
//!
//! Each subsystem owns a precise error type ([`WizardError`], [`ProviderError`],
//! [`DriverError`]). [`InstallKitError`] collects them for callers that just
//! want one type, such as the command-line front end.

use thiserror::Error;

use crate::driver::DriverError;
use crate::provider::ProviderError;
use crate::wizard::WizardError;

/// Main error type for installkit
#[derive(Error, Debug)]
pub enum InstallKitError {
    /// IO errors (reading or writing files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// State machine errors
    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    /// Provider construction or lookup errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Errors while driving a flow
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Malformed command-line input
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for installkit operations
pub type Result<T> = std::result::Result<T, InstallKitError>;

impl InstallKitError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an argument error
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }
}
