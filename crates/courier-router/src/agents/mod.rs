//! Agent lifecycle collaborator.
//!
//! The `agents` module dispatches into an [`AgentLifecycle`] implementation.
//! [`InMemoryAgents`] keeps everything in process so the gateway runs without
//! external systems.

mod in_memory;
mod lifecycle;

pub use in_memory::InMemoryAgents;
pub use lifecycle::{Agent, AgentConfig, AgentError, AgentLifecycle, AgentStatus};
