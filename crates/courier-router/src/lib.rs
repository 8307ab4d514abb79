//! # Courier Router
//!
//! Maps dotted command strings onto handlers and enforces their parameter
//! contracts.
//!
//! ## Dispatch
//!
//! ```text
//! "agents.get_agent", {id}
//!     │
//!     ├─ split on first '.'       → Invalid command format …
//!     ├─ module in fixed set?     → Unknown module: X
//!     ├─ module bound?            → <Module> commands not implemented yet
//!     ├─ function registered?     → Unknown function: X
//!     ├─ required params present? → Missing required parameter(s): …
//!     └─ handler → collaborator
//! ```
//!
//! Every outcome is a [`GatewayResult`](courier_core::GatewayResult), or an
//! [`Envelope`](courier_core::Envelope) via [`CommandRouter::dispatch`].
//!
//! ## Modules
//!
//! | Module       | State                                 |
//! |--------------|---------------------------------------|
//! | `agents`     | 13 functions over [`agents::AgentLifecycle`] |
//! | `system`     | `health`                              |
//! | others       | not implemented                       |

#![doc(html_root_url = "https://docs.rs/courier-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod agents;
mod command;
pub mod modules;
mod params;
mod registry;
mod router;

pub use command::{Command, Module};
pub use params::Params;
pub use registry::{
    ErasedHandler, HandlerResult, ModuleDispatcher, Registration, Registry, RegistryBuilder,
    RegistryError,
};
pub use router::CommandRouter;
