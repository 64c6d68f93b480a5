//! Error types for the automation host

use thiserror::Error;

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the automation host
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the host or its engine backend
    #[error("Host initialization failed: {0}")]
    InitializationError(String),

    /// Failed to render or export the page
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to read, convert, or execute the driving script
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
