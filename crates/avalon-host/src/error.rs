use avalon_plugins::PluginError;
use thiserror::Error;

use crate::contract::ContractReport;

/// Errors from host and config adapters.
#[derive(Debug, Error)]
pub enum HostError {
    /// The adapter does not satisfy its contract. Lists every offending
    /// member.
    #[error("{0}")]
    ContractViolation(ContractReport),

    /// The adapter does not implement the operation.
    #[error("host {host:?} does not support {operation}")]
    Unsupported {
        host: String,
        operation: &'static str,
    },

    #[error("no container named {name:?} in namespace {namespace:?}")]
    ContainerNotFound { name: String, namespace: String },

    /// A plug-in invoked by the host failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// The adapter ran and failed.
    #[error("{adapter:?} failed: {reason}")]
    Failed { adapter: String, reason: String },

    #[error("host state lock poisoned")]
    LockPoisoned,
}

impl HostError {
    pub fn failed(adapter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            adapter: adapter.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for host operations.
pub type HostResult<T> = Result<T, HostError>;
