//! Command string parsing and the module enumeration.

use courier_core::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A dotted command split on its first `.`.
///
/// The function part keeps any further dots, so nested namespaces such as
/// `storage.ipfs.pin` parse as module `storage`, function `ipfs.pin`.
///
/// # Example
///
/// ```
/// use courier_router::Command;
///
/// let command = Command::parse("storage.ipfs.pin").unwrap();
/// assert_eq!(command.module(), "storage");
/// assert_eq!(command.function(), "ipfs.pin");
///
/// assert!(Command::parse("health").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    module: String,
    function: String,
}

impl Command {
    /// Parses `module.function`.
    pub fn parse(command: &str) -> Result<Self, GatewayError> {
        match command.split_once('.') {
            Some((module, function)) => Ok(Self {
                module: module.to_string(),
                function: function.to_string(),
            }),
            None => Err(GatewayError::parse(format!(
                "Invalid command format: '{command}', expected module.function"
            ))),
        }
    }

    /// Returns the module segment, exactly as given.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Returns everything after the first dot.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.function)
    }
}

/// The fixed set of command modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    /// Agent lifecycle, tasks and memory.
    Agents,
    /// Multi-agent swarms.
    Swarms,
    /// Decentralized storage.
    Storage,
    /// On-chain reads and transactions.
    Blockchain,
    /// Decentralized exchange operations.
    Dex,
    /// Gateway introspection.
    System,
    /// Runtime metrics.
    Metrics,
    /// Cross-chain bridge.
    Bridge,
}

impl Module {
    /// All modules in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Agents,
        Self::Swarms,
        Self::Storage,
        Self::Blockchain,
        Self::Dex,
        Self::System,
        Self::Metrics,
        Self::Bridge,
    ];

    /// Returns the name used in command strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::Swarms => "swarms",
            Self::Storage => "storage",
            Self::Blockchain => "blockchain",
            Self::Dex => "dex",
            Self::System => "system",
            Self::Metrics => "metrics",
            Self::Bridge => "bridge",
        }
    }

    /// Returns the capitalized name used in messages.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Agents => "Agents",
            Self::Swarms => "Swarms",
            Self::Storage => "Storage",
            Self::Blockchain => "Blockchain",
            Self::Dex => "Dex",
            Self::System => "System",
            Self::Metrics => "Metrics",
            Self::Bridge => "Bridge",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = GatewayError;

    /// Matches the exact lowercase name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| GatewayError::parse(format!("Unknown module: {s}")))
    }
}
