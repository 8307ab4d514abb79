//! Module dispatchers.
//!
//! `agents` and `system` are implemented. The remaining modules are
//! registered without a collaborator and answer every function with
//! `"<Module> commands not implemented yet"`. Binding one means adding a
//! `register` function here with the same validate-then-delegate shape as
//! [`agents`].

pub mod agents;
pub mod system;

use crate::command::Module;
use crate::registry::RegistryBuilder;

/// Modules registered without a collaborator.
pub const UNBOUND: [Module; 6] = [
    Module::Swarms,
    Module::Storage,
    Module::Blockchain,
    Module::Dex,
    Module::Metrics,
    Module::Bridge,
];

/// Declares every unbound module as not implemented.
pub fn register_unbound(builder: RegistryBuilder) -> RegistryBuilder {
    UNBOUND
        .into_iter()
        .fold(builder, RegistryBuilder::unimplemented)
}
