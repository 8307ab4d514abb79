//! The `system` module.

use crate::command::Module;
use crate::params::Params;
use crate::registry::{HandlerResult, RegistryBuilder};
use chrono::Utc;
use serde_json::json;

/// Registers every `system.*` function.
pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder.command(Module::System, "health", &[], health)
}

/// Reports gateway liveness and the known modules.
async fn health(_params: Params) -> HandlerResult {
    let modules: Vec<&str> = Module::ALL.iter().map(|m| m.as_str()).collect();
    Ok(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "modules": modules,
    }))
}
