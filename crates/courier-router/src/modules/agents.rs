//! The `agents` module.
//!
//! Each function validates its parameters through the registration table,
//! then delegates to the [`AgentLifecycle`] collaborator. Collaborator
//! failures are converted here, prefixed with the operation that failed.

use crate::agents::{AgentConfig, AgentError, AgentLifecycle, AgentStatus};
use crate::command::Module;
use crate::params::Params;
use crate::registry::{HandlerResult, RegistryBuilder};
use courier_core::GatewayError;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

type Agents = Arc<dyn AgentLifecycle>;

/// Registers every `agents.*` function.
pub fn register(builder: RegistryBuilder, agents: &Agents) -> RegistryBuilder {
    builder
        .command(Module::Agents, "create_agent", &["name", "type"], bind(agents, create_agent))
        .command(Module::Agents, "list_agents", &[], bind(agents, list_agents))
        .command(Module::Agents, "get_agent", &["id"], bind(agents, get_agent))
        .command(Module::Agents, "start_agent", &["id"], bind(agents, start_agent))
        .command(Module::Agents, "stop_agent", &["id"], bind(agents, stop_agent))
        .command(Module::Agents, "pause_agent", &["id"], bind(agents, pause_agent))
        .command(Module::Agents, "resume_agent", &["id"], bind(agents, resume_agent))
        .command(Module::Agents, "get_agent_status", &["id"], bind(agents, get_agent_status))
        .command(
            Module::Agents,
            "execute_agent_task",
            &["id", "task"],
            bind(agents, execute_agent_task),
        )
        .command(
            Module::Agents,
            "get_agent_memory",
            &["id", "key"],
            bind(agents, get_agent_memory),
        )
        .command(
            Module::Agents,
            "set_agent_memory",
            &["id", "key", "value"],
            bind(agents, set_agent_memory),
        )
        .command(
            Module::Agents,
            "clear_agent_memory",
            &["id"],
            bind(agents, clear_agent_memory),
        )
        .command(Module::Agents, "delete_agent", &["id"], bind(agents, delete_agent))
}

/// Captures the collaborator in a `Fn(Params)` handler.
fn bind<F, Fut>(agents: &Agents, handler: F) -> impl Fn(Params) -> Fut + Send + Sync + 'static
where
    F: Fn(Agents, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let agents = Arc::clone(agents);
    move |params| handler(Arc::clone(&agents), params)
}

/// Converts a collaborator failure.
fn failure(err: AgentError, context: &str) -> GatewayError {
    match err {
        AgentError::NotFound(id) => GatewayError::not_found_resource("Agent", id),
        AgentError::InvalidState { .. } => GatewayError::validation(err.to_string()),
        AgentError::Failed(message) => {
            GatewayError::collaborator(message, Some(Module::Agents.as_str())).context(context)
        }
    }
}

fn missing(id: &str) -> GatewayError {
    GatewayError::not_found_resource("Agent", id)
}

fn to_data<T: Serialize>(value: &T) -> HandlerResult {
    serde_json::to_value(value)
        .map_err(|e| GatewayError::internal(format!("Failed to encode result: {e}")))
}

async fn create_agent(agents: Agents, params: Params) -> HandlerResult {
    let config = AgentConfig {
        name: params.str("name")?,
        agent_type: params.str("type")?,
        config: params.optional("config").unwrap_or_else(|| json!({})),
    };

    let agent = agents
        .create_agent(config)
        .await
        .map_err(|e| failure(e, "Error creating agent"))?;
    to_data(&agent)
}

async fn list_agents(agents: Agents, _params: Params) -> HandlerResult {
    let list = agents
        .list_agents()
        .await
        .map_err(|e| failure(e, "Error listing agents"))?;
    to_data(&list)
}

async fn get_agent(agents: Agents, params: Params) -> HandlerResult {
    let id = params.str("id")?;
    let agent = agents
        .get_agent(&id)
        .await
        .map_err(|e| failure(e, "Error getting agent"))?
        .ok_or_else(|| missing(&id))?;
    to_data(&agent)
}

/// A status change requested through the router.
#[derive(Debug, Clone, Copy)]
enum Transition {
    Start,
    Stop,
    Pause,
    Resume,
}

impl Transition {
    const fn context(self) -> &'static str {
        match self {
            Self::Start => "Error starting agent",
            Self::Stop => "Error stopping agent",
            Self::Pause => "Error pausing agent",
            Self::Resume => "Error resuming agent",
        }
    }

    const fn target(self) -> AgentStatus {
        match self {
            Self::Start | Self::Resume => AgentStatus::Running,
            Self::Stop => AgentStatus::Stopped,
            Self::Pause => AgentStatus::Paused,
        }
    }
}

async fn transition(agents: Agents, params: Params, transition: Transition) -> HandlerResult {
    let id = params.str("id")?;
    let applied = match transition {
        Transition::Start => agents.start_agent(&id).await,
        Transition::Stop => agents.stop_agent(&id).await,
        Transition::Pause => agents.pause_agent(&id).await,
        Transition::Resume => agents.resume_agent(&id).await,
    }
    .map_err(|e| failure(e, transition.context()))?;

    if !applied {
        return Err(missing(&id));
    }
    Ok(json!({ "id": id, "status": transition.target() }))
}

async fn start_agent(agents: Agents, params: Params) -> HandlerResult {
    transition(agents, params, Transition::Start).await
}

async fn stop_agent(agents: Agents, params: Params) -> HandlerResult {
    transition(agents, params, Transition::Stop).await
}

async fn pause_agent(agents: Agents, params: Params) -> HandlerResult {
    transition(agents, params, Transition::Pause).await
}

async fn resume_agent(agents: Agents, params: Params) -> HandlerResult {
    transition(agents, params, Transition::Resume).await
}

async fn get_agent_status(agents: Agents, params: Params) -> HandlerResult {
    let id = params.str("id")?;
    agents
        .get_agent_status(&id)
        .await
        .map_err(|e| failure(e, "Error getting agent status"))?
        .ok_or_else(|| missing(&id))
}

async fn execute_agent_task(agents: Agents, params: Params) -> HandlerResult {
    let id = params.str("id")?;
    let task = params.value("task")?;
    agents
        .execute_agent_task(&id, task)
        .await
        .map_err(|e| failure(e, "Error executing agent task"))
}

async fn get_agent_memory(agents: Agents, params: Params) -> HandlerResult {
    let id = params.str("id")?;
    let key = params.str("key")?;
    let value = agents
        .get_agent_memory(&id, &key)
        .await
        .map_err(|e| failure(e, "Error getting agent memory"))?;
    Ok(json!({ "id": id, "key": key, "value": value.unwrap_or(Value::Null) }))
}

async fn set_agent_memory(agents: Agents, params: Params) -> HandlerResult {
    let id = params.str("id")?;
    let key = params.str("key")?;
    let value = params.value("value")?;

    let stored = agents
        .set_agent_memory(&id, &key, value)
        .await
        .map_err(|e| failure(e, "Error setting agent memory"))?;
    if !stored {
        return Err(missing(&id));
    }
    Ok(json!({ "id": id, "key": key, "stored": true }))
}

async fn clear_agent_memory(agents: Agents, params: Params) -> HandlerResult {
    let id = params.str("id")?;
    let cleared = agents
        .clear_agent_memory(&id)
        .await
        .map_err(|e| failure(e, "Error clearing agent memory"))?;
    if !cleared {
        return Err(missing(&id));
    }
    Ok(json!({ "id": id, "cleared": true }))
}

async fn delete_agent(agents: Agents, params: Params) -> HandlerResult {
    let id = params.str("id")?;
    let deleted = agents
        .delete_agent(&id)
        .await
        .map_err(|e| failure(e, "Error deleting agent"))?;
    if !deleted {
        return Err(missing(&id));
    }
    Ok(json!({ "id": id, "deleted": true }))
}
