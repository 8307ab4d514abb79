//! # Courier Server
//!
//! HTTP transport for the Courier command gateway.
//!
//! - HTTP/1.1 via hyper
//! - Endpoints mapping onto the command router
//! - Health payload
//! - Graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use courier_config::ConfigLoader;
//! use courier_router::{agents::InMemoryAgents, CommandRouter};
//! use courier_server::Server;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().with_env_prefix("COURIER").load()?;
//!     let router = CommandRouter::standard(Arc::new(InMemoryAgents::new()))?;
//!     Server::from_config(&config, Arc::new(router))?.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/courier-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod gateway;
mod health;
mod server;
pub mod shutdown;

pub use error::ServerError;
pub use gateway::{build_chain, Gateway};
pub use health::{HealthCheck, HealthStatus};
pub use server::Server;
pub use shutdown::ShutdownSignal;
