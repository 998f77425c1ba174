use std::path::PathBuf;

use avalon_types::TypeError;
use thiserror::Error;

use crate::role::PluginRole;

/// Errors from plug-in registration, discovery and invocation.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A registered discovery path does not exist or is not a directory.
    #[error("plug-in path does not exist or is not a directory: {}", .0.display())]
    MissingPath(PathBuf),

    #[error("could not read plug-in manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("manifest {} references unknown implementation {implementation:?}", path.display())]
    UnknownImplementation {
        path: PathBuf,
        implementation: String,
    },

    #[error("plug-in {name:?} was declared as {expected} but its factory built a {actual}")]
    RoleMismatch {
        name: String,
        expected: PluginRole,
        actual: PluginRole,
    },

    #[error("invalid plug-in name: {0}")]
    InvalidName(#[from] TypeError),

    /// An instance with the same name already exists.
    #[error("an instance named {name:?} already exists")]
    NameCollision { name: String },

    /// The representation path template could not be formatted.
    #[error("could not compute path for {representation}: {source}")]
    Template {
        representation: String,
        source: TypeError,
    },

    /// The plug-in does not implement the requested operation.
    #[error("plug-in {plugin:?} does not support {operation}")]
    Unsupported {
        plugin: String,
        operation: &'static str,
    },

    /// The plug-in ran and failed.
    #[error("plug-in {plugin:?} failed: {reason}")]
    Failed { plugin: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for plug-in operations.
pub type PluginResult<T> = Result<T, PluginError>;
