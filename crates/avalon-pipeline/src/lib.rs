//! # Avalon pipeline kernel
//!
//! [`PipelineKernel`] owns one process's pipeline state: the [`Session`],
//! the plug-in registry, the event bus, the document store handle, and the
//! registered host and config.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninstalled --install(host)--> Installed --uninstall()--> Uninstalled
//! ```
//!
//! `install` resets the session from the [`Environment`], checks the
//! required session keys, connects the store, resolves the project's config
//! through a registered provider, validates host and config against their
//! contracts, runs their install hooks and registers both. Any failure
//! leaves the previous registrations untouched and the store disconnected.
//!
//! ## Scene operations
//!
//! `create`, `load`, `update`, `switch`, `remove` and `publish` resolve
//! documents and plug-ins, then delegate the scene mutation to the
//! registered host, emitting `before_<op>` and `after_<op>` events around
//! it.

pub mod context;
pub mod environment;
pub mod error;
pub mod facade;
pub mod kernel;
pub mod session;
pub mod settings;

#[cfg(test)]
mod fixtures;

pub use environment::Environment;
pub use error::{PipelineError, PipelineResult};
pub use kernel::{ConfigProvider, PipelineKernel};
pub use session::{Session, SessionChanges, CONTEXT_KEYS, NO_CONFIG, SESSION_SCHEMA};
pub use settings::KernelSettings;

pub use avalon_store::VersionSelector;
