//! Process-local agent collaborator.

use super::lifecycle::{Agent, AgentConfig, AgentError, AgentLifecycle, AgentStatus};
use chrono::Utc;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug)]
struct Record {
    agent: Agent,
    memory: Map<String, Value>,
    tasks_executed: u64,
}

/// Keeps agents in a process-local map.
///
/// Status transitions:
///
/// ```text
/// created ──start──▶ running ──pause──▶ paused
///                      ▲   ◀──resume──   │
///                      │                 │
///    stopped ◀──stop───┴───────stop──────┘
///       └──────start──────▶ running
/// ```
///
/// Starting a running agent and stopping a stopped agent are no-ops.
///
/// # Example
///
/// ```
/// use courier_router::agents::{AgentConfig, AgentLifecycle, InMemoryAgents};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let agents = InMemoryAgents::new();
/// let agent = agents
///     .create_agent(AgentConfig {
///         name: "scout".into(),
///         agent_type: "research".into(),
///         config: json!({}),
///     })
///     .await
///     .unwrap();
/// assert!(agents.start_agent(&agent.id).await.unwrap());
/// assert!(!agents.start_agent("missing").await.unwrap());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryAgents {
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryAgents {
    /// Creates an empty collaborator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if no agents exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Applies a status transition. `Ok(false)` when the agent is unknown.
    fn transition(
        &self,
        id: &str,
        action: &'static str,
        next: impl FnOnce(AgentStatus) -> Option<AgentStatus>,
    ) -> Result<bool, AgentError> {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(id) else {
            return Ok(false);
        };

        let current = record.agent.status;
        let status = next(current).ok_or_else(|| AgentError::InvalidState {
            id: id.to_string(),
            status: current,
            action,
        })?;

        if status != current {
            record.agent.status = status;
            record.agent.updated = Utc::now();
        }
        Ok(true)
    }

    /// Runs `f` on an existing record.
    fn with_record<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Record) -> Result<T, AgentError>,
    ) -> Result<T, AgentError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| AgentError::NotFound(id.to_string()))?;
        f(record)
    }
}

impl AgentLifecycle for InMemoryAgents {
    fn create_agent(&self, config: AgentConfig) -> BoxFuture<'_, Result<Agent, AgentError>> {
        Box::pin(async move {
            let now = Utc::now();
            let agent = Agent {
                id: Uuid::new_v4().to_string(),
                name: config.name,
                agent_type: config.agent_type,
                status: AgentStatus::Created,
                config: if config.config.is_null() {
                    json!({})
                } else {
                    config.config
                },
                created: now,
                updated: now,
            };

            self.records.write().insert(
                agent.id.clone(),
                Record {
                    agent: agent.clone(),
                    memory: Map::new(),
                    tasks_executed: 0,
                },
            );
            tracing::debug!(agent_id = %agent.id, agent_type = %agent.agent_type, "agent created");
            Ok(agent)
        })
    }

    fn list_agents(&self) -> BoxFuture<'_, Result<Vec<Agent>, AgentError>> {
        Box::pin(async move {
            let mut agents: Vec<Agent> = self
                .records
                .read()
                .values()
                .map(|r| r.agent.clone())
                .collect();
            agents.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
            Ok(agents)
        })
    }

    fn get_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Agent>, AgentError>> {
        Box::pin(async move { Ok(self.records.read().get(id).map(|r| r.agent.clone())) })
    }

    fn start_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>> {
        Box::pin(async move {
            self.transition(id, "start", |status| match status {
                AgentStatus::Created | AgentStatus::Stopped | AgentStatus::Running => {
                    Some(AgentStatus::Running)
                }
                AgentStatus::Paused => None,
            })
        })
    }

    fn stop_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>> {
        Box::pin(async move { self.transition(id, "stop", |_| Some(AgentStatus::Stopped)) })
    }

    fn pause_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>> {
        Box::pin(async move {
            self.transition(id, "pause", |status| {
                (status == AgentStatus::Running).then_some(AgentStatus::Paused)
            })
        })
    }

    fn resume_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>> {
        Box::pin(async move {
            self.transition(id, "resume", |status| {
                (status == AgentStatus::Paused).then_some(AgentStatus::Running)
            })
        })
    }

    fn get_agent_status<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, AgentError>> {
        Box::pin(async move {
            Ok(self.records.read().get(id).map(|record| {
                json!({
                    "id": record.agent.id,
                    "status": record.agent.status,
                    "updated": record.agent.updated,
                    "memory_keys": record.memory.len(),
                    "tasks_executed": record.tasks_executed,
                })
            }))
        })
    }

    fn execute_agent_task<'a>(
        &'a self,
        id: &'a str,
        task: Value,
    ) -> BoxFuture<'a, Result<Value, AgentError>> {
        Box::pin(async move {
            self.with_record(id, |record| {
                if record.agent.status != AgentStatus::Running {
                    return Err(AgentError::InvalidState {
                        id: id.to_string(),
                        status: record.agent.status,
                        action: "execute a task on",
                    });
                }

                record.tasks_executed += 1;
                Ok(json!({
                    "task_id": Uuid::new_v4().to_string(),
                    "agent_id": id,
                    "status": "completed",
                    "task": task,
                    "completed_at": Utc::now(),
                }))
            })
        })
    }

    fn get_agent_memory<'a>(
        &'a self,
        id: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, AgentError>> {
        Box::pin(async move { self.with_record(id, |record| Ok(record.memory.get(key).cloned())) })
    }

    fn set_agent_memory<'a>(
        &'a self,
        id: &'a str,
        key: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<bool, AgentError>> {
        Box::pin(async move {
            let mut records = self.records.write();
            let Some(record) = records.get_mut(id) else {
                return Ok(false);
            };
            record.memory.insert(key.to_string(), value);
            record.agent.updated = Utc::now();
            Ok(true)
        })
    }

    fn clear_agent_memory<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>> {
        Box::pin(async move {
            let mut records = self.records.write();
            let Some(record) = records.get_mut(id) else {
                return Ok(false);
            };
            record.memory.clear();
            record.agent.updated = Utc::now();
            Ok(true)
        })
    }

    fn delete_agent<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, AgentError>> {
        Box::pin(async move { Ok(self.records.write().remove(id).is_some()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn created(agents: &InMemoryAgents) -> Agent {
        agents
            .create_agent(AgentConfig {
                name: "alpha".to_string(),
                agent_type: "trading".to_string(),
                config: Value::Null,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let agents = InMemoryAgents::new();
        let agent = created(&agents).await;

        assert_eq!(agent.status, AgentStatus::Created);
        assert_eq!(agent.config, json!({}));
        assert_eq!(agents.get_agent(&agent.id).await.unwrap(), Some(agent.clone()));
        assert_eq!(agents.list_agents().await.unwrap(), vec![agent]);
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let agents = InMemoryAgents::new();
        let id = created(&agents).await.id;

        assert!(matches!(
            agents.pause_agent(&id).await,
            Err(AgentError::InvalidState { action: "pause", .. })
        ));

        assert!(agents.start_agent(&id).await.unwrap());
        assert!(agents.pause_agent(&id).await.unwrap());
        assert!(matches!(
            agents.start_agent(&id).await,
            Err(AgentError::InvalidState { status: AgentStatus::Paused, .. })
        ));
        assert!(agents.resume_agent(&id).await.unwrap());
        assert!(agents.stop_agent(&id).await.unwrap());
        assert_eq!(
            agents.get_agent(&id).await.unwrap().unwrap().status,
            AgentStatus::Stopped
        );
        assert!(agents.start_agent(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_agent_is_false_or_none() {
        let agents = InMemoryAgents::new();
        assert!(!agents.start_agent("nope").await.unwrap());
        assert!(!agents.delete_agent("nope").await.unwrap());
        assert!(agents.get_agent_status("nope").await.unwrap().is_none());
        assert!(matches!(
            agents.get_agent_memory("nope", "k").await,
            Err(AgentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_tasks_require_running() {
        let agents = InMemoryAgents::new();
        let id = created(&agents).await.id;

        assert!(agents.execute_agent_task(&id, json!("scan")).await.is_err());

        agents.start_agent(&id).await.unwrap();
        let result = agents.execute_agent_task(&id, json!("scan")).await.unwrap();
        assert_eq!(result["status"], "completed");
        assert_eq!(result["task"], "scan");

        let status = agents.get_agent_status(&id).await.unwrap().unwrap();
        assert_eq!(status["tasks_executed"], 1);
        assert_eq!(status["status"], "running");
    }

    #[tokio::test]
    async fn test_memory() {
        let agents = InMemoryAgents::new();
        let id = created(&agents).await.id;

        assert_eq!(agents.get_agent_memory(&id, "k").await.unwrap(), None);
        assert!(agents.set_agent_memory(&id, "k", json!({"v": 1})).await.unwrap());
        assert_eq!(
            agents.get_agent_memory(&id, "k").await.unwrap(),
            Some(json!({"v": 1}))
        );
        assert!(agents.clear_agent_memory(&id).await.unwrap());
        assert_eq!(agents.get_agent_memory(&id, "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let agents = InMemoryAgents::new();
        let id = created(&agents).await.id;

        assert!(agents.delete_agent(&id).await.unwrap());
        assert!(agents.is_empty());
    }
}
