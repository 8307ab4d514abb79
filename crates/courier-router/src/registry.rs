//! The `(module, function)` registration table.
//!
//! Every callable command is registered once at startup together with the
//! parameters it requires. The table is validated while it is built and can
//! be enumerated afterwards.

use crate::command::Module;
use crate::params::Params;
use courier_core::GatewayError;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Result of a command handler.
pub type HandlerResult = Result<Value, GatewayError>;

/// A type-erased command handler.
pub type ErasedHandler = Arc<dyn Fn(Params) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Errors detected while building the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The same `module.function` was registered twice.
    #[error("command registered twice: {module}.{function}")]
    Duplicate {
        /// The module.
        module: Module,
        /// The function.
        function: String,
    },

    /// A function was registered on a module declared unimplemented.
    #[error("module {module} is declared unimplemented but has command {function}")]
    UnimplementedModule {
        /// The module.
        module: Module,
        /// The function.
        function: String,
    },

    /// A function name was empty.
    #[error("empty function name registered on module {0}")]
    EmptyFunction(Module),
}

/// One registered command.
#[derive(Clone)]
pub struct Registration {
    required: &'static [&'static str],
    handler: ErasedHandler,
}

impl Registration {
    /// Returns the parameters validated before the handler runs.
    #[must_use]
    pub fn required(&self) -> &'static [&'static str] {
        self.required
    }

    /// Validates `params` and invokes the handler.
    pub async fn invoke(&self, params: Params) -> HandlerResult {
        params.require(self.required)?;
        (self.handler)(params).await
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("required", &self.required)
            .field("handler", &"<fn>")
            .finish()
    }
}

/// How a module answers commands.
#[derive(Debug, Clone)]
pub enum ModuleDispatcher {
    /// A table of functions.
    Functions(BTreeMap<String, Registration>),
    /// Registered, but no collaborator is bound yet.
    NotImplemented,
}

impl ModuleDispatcher {
    /// Returns `true` if the module has functions.
    #[must_use]
    pub fn is_implemented(&self) -> bool {
        matches!(self, Self::Functions(_))
    }
}

static NOT_IMPLEMENTED: ModuleDispatcher = ModuleDispatcher::NotImplemented;

/// The validated registration table.
///
/// Holds a dispatcher for every [`Module`].
#[derive(Debug, Clone)]
pub struct Registry {
    modules: BTreeMap<Module, ModuleDispatcher>,
}

impl Registry {
    /// Creates a new registry builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the dispatcher for `module`.
    #[must_use]
    pub fn dispatcher(&self, module: Module) -> &ModuleDispatcher {
        self.modules
            .get(&module)
            .unwrap_or(&NOT_IMPLEMENTED)
    }

    /// Returns every registered command as `module.function`, sorted.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.modules
            .iter()
            .filter_map(|(module, dispatcher)| match dispatcher {
                ModuleDispatcher::Functions(table) => Some((module, table)),
                ModuleDispatcher::NotImplemented => None,
            })
            .flat_map(|(module, table)| table.keys().map(move |f| format!("{module}.{f}")))
            .collect()
    }

    /// Returns the modules that have at least one function.
    #[must_use]
    pub fn implemented_modules(&self) -> Vec<Module> {
        self.modules
            .iter()
            .filter(|(_, d)| d.is_implemented())
            .map(|(m, _)| *m)
            .collect()
    }
}

/// Builder for the registration table.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    functions: BTreeMap<Module, BTreeMap<String, Registration>>,
    unimplemented: BTreeSet<Module>,
    errors: Vec<RegistryError>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module.function`.
    ///
    /// `required` lists the parameters that must be present and non-null;
    /// the handler is not invoked otherwise.
    #[must_use]
    pub fn command<F, Fut>(
        mut self,
        module: Module,
        function: &str,
        required: &'static [&'static str],
        handler: F,
    ) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if function.is_empty() {
            self.errors.push(RegistryError::EmptyFunction(module));
            return self;
        }

        let handler: ErasedHandler =
            Arc::new(move |params| -> BoxFuture<'static, HandlerResult> { Box::pin(handler(params)) });
        let table = self.functions.entry(module).or_default();
        if table.contains_key(function) {
            self.errors.push(RegistryError::Duplicate {
                module,
                function: function.to_string(),
            });
        } else {
            table.insert(function.to_string(), Registration { required, handler });
        }
        self
    }

    /// Declares a module registered but not implemented.
    #[must_use]
    pub fn unimplemented(mut self, module: Module) -> Self {
        self.unimplemented.insert(module);
        self
    }

    /// Validates and builds the table.
    ///
    /// Modules that received neither functions nor an explicit declaration
    /// are treated as unimplemented.
    pub fn build(mut self) -> Result<Registry, RegistryError> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }

        for module in &self.unimplemented {
            if let Some(function) = self
                .functions
                .get(module)
                .and_then(|table| table.keys().next())
            {
                return Err(RegistryError::UnimplementedModule {
                    module: *module,
                    function: function.clone(),
                });
            }
        }

        let mut functions = self.functions;
        let modules = Module::ALL
            .into_iter()
            .map(|module| {
                let dispatcher = match functions.remove(&module) {
                    Some(table) => ModuleDispatcher::Functions(table),
                    None => ModuleDispatcher::NotImplemented,
                };
                (module, dispatcher)
            })
            .collect();
        Ok(Registry { modules })
    }
}
