//! Server error types.

use courier_config::ConfigError;
use courier_middleware::ChainBuildError;
use courier_router::RegistryError;
use thiserror::Error;

/// Errors raised while assembling or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("Failed to bind: {0}")]
    Bind(String),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The middleware chain could not be assembled.
    #[error("Invalid middleware chain: {0}")]
    Chain(#[from] ChainBuildError),

    /// The command registration table could not be built.
    #[error("Invalid command registry: {0}")]
    Registry(#[from] RegistryError),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
