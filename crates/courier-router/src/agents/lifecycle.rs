//! The agent lifecycle collaborator contract.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Lifecycle state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Created, never started.
    Created,
    /// Accepting tasks.
    Running,
    /// Temporarily not accepting tasks.
    Paused,
    /// Stopped; may be started again.
    Stopped,
}

impl AgentStatus {
    /// Returns the lowercase status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name.
    pub name: String,
    /// Agent type, e.g. `trading` or `research`.
    #[serde(rename = "type")]
    pub agent_type: String,
    /// Free-form type-specific settings.
    #[serde(default)]
    pub config: Value,
}

/// An agent as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Agent type.
    #[serde(rename = "type")]
    pub agent_type: String,
    /// Current lifecycle state.
    pub status: AgentStatus,
    /// Type-specific settings.
    pub config: Value,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Last modification time.
    pub updated: DateTime<Utc>,
}

/// Failures reported by an agent collaborator.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No agent with this id.
    #[error("Agent not found: {0}")]
    NotFound(String),

    /// The requested action is not valid from the current status.
    #[error("Cannot {action} agent {id} while {status}")]
    InvalidState {
        /// The agent id.
        id: String,
        /// The current status.
        status: AgentStatus,
        /// The rejected action.
        action: &'static str,
    },

    /// The collaborator failed.
    #[error("{0}")]
    Failed(String),
}

/// Operations the `agents` module delegates to.
///
/// Lookups by id return `Ok(None)` or `Ok(false)` when the agent does not
/// exist; `Err` is reserved for collaborator failures.
pub trait AgentLifecycle: Send + Sync + 'static {
    /// Creates an agent.
    fn create_agent(&self, config: AgentConfig) -> BoxFuture<'_, Result<Agent, AgentError>>;

    /// Lists every agent.
    fn list_agents(&self) -> BoxFuture<'_, Result<Vec<Agent>, AgentError>>;

    /// Looks up one agent.
    fn get_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Agent>, AgentError>>;

    /// Starts an agent.
    fn start_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>>;

    /// Stops an agent.
    fn stop_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>>;

    /// Pauses a running agent.
    fn pause_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>>;

    /// Resumes a paused agent.
    fn resume_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>>;

    /// Returns a status report.
    fn get_agent_status<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, AgentError>>;

    /// Runs a task on an agent and returns its result.
    fn execute_agent_task<'a>(
        &'a self,
        id: &'a str,
        task: Value,
    ) -> BoxFuture<'a, Result<Value, AgentError>>;

    /// Reads one memory entry. `Ok(None)` when the key is unset.
    fn get_agent_memory<'a>(
        &'a self,
        id: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, AgentError>>;

    /// Writes one memory entry.
    fn set_agent_memory<'a>(
        &'a self,
        id: &'a str,
        key: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<bool, AgentError>>;

    /// Removes every memory entry.
    fn clear_agent_memory<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>>;

    /// Deletes an agent.
    fn delete_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>>;
}
