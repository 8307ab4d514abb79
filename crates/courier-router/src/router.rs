//! The command router.

use crate::agents::AgentLifecycle;
use crate::command::{Command, Module};
use crate::modules;
use crate::params::Params;
use crate::registry::{ModuleDispatcher, Registry, RegistryBuilder, RegistryError};
use courier_core::{Envelope, ErrorKind, GatewayError, GatewayResult};
use serde_json::Value;
use std::sync::Arc;

/// Routes `module.function` commands to their handlers.
///
/// Stateless between calls; share it behind an `Arc`.
///
/// # Example
///
/// ```
/// use courier_router::agents::InMemoryAgents;
/// use courier_router::{CommandRouter, Params};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let router = CommandRouter::standard(Arc::new(InMemoryAgents::new())).unwrap();
///
/// let envelope = router.dispatch("system.health", Params::new()).await;
/// assert!(envelope.is_success());
///
/// let envelope = router.dispatch("dex.swap", Params::new()).await;
/// assert_eq!(envelope.error_message(), Some("Dex commands not implemented yet"));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct CommandRouter {
    registry: Registry,
}

impl CommandRouter {
    /// Creates a router over a built registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Creates a new registry builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Creates the standard router: `agents` bound to `agents`, `system`
    /// implemented, every other module unbound.
    pub fn standard(agents: Arc<dyn AgentLifecycle>) -> Result<Self, RegistryError> {
        let builder = modules::agents::register(RegistryBuilder::new(), &agents);
        let builder = modules::system::register(builder);
        let builder = modules::register_unbound(builder);
        Ok(Self::new(builder.build()?))
    }

    /// Returns the registration table.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns every registered command as `module.function`, sorted.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.registry.commands()
    }

    /// Runs a command, returning the handler's data or the error.
    pub async fn execute(&self, command: &str, params: Params) -> GatewayResult<Value> {
        let parsed = Command::parse(command)?;
        let module: Module = parsed.module().parse()?;

        let registration = match self.registry.dispatcher(module) {
            ModuleDispatcher::NotImplemented => {
                return Err(GatewayError::not_implemented(format!(
                    "{} commands not implemented yet",
                    module.title()
                )));
            }
            ModuleDispatcher::Functions(table) => table.get(parsed.function()).ok_or_else(|| {
                GatewayError::parse(format!("Unknown function: {}", parsed.function()))
            })?,
        };

        let logged = params.to_value();
        let result = registration.invoke(params).await;

        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::Collaborator | ErrorKind::Internal => tracing::error!(
                    command = %command,
                    module = %module,
                    function = %parsed.function(),
                    params = %logged,
                    error = %err,
                    "command failed"
                ),
                _ => tracing::debug!(
                    command = %command,
                    error = %err,
                    "command rejected"
                ),
            }
        }
        result
    }

    /// Runs a command and wraps the outcome in an envelope.
    pub async fn dispatch(&self, command: &str, params: Params) -> Envelope {
        match self.execute(command, params).await {
            Ok(data) => Envelope::ok(data),
            Err(err) => err.to_envelope(),
        }
    }
}
