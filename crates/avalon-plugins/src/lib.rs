//! Plug-in registry for the Avalon pipeline kernel.
//!
//! Plug-ins fill one of four roles ([`PluginRole`]):
//!
//! - [`Loader`] -- brings a published representation into the host scene
//! - [`Creator`] -- creates publishable instances
//! - [`Action`] -- session-level tools, e.g. application launchers
//! - [`InventoryAction`] -- tools run on loaded containers
//!
//! Plug-ins reach the [`PluginRegistry`] in two ways. Code registers them
//! directly with [`PluginRegistry::register_plugin`]. Studios list them in
//! TOML manifests placed in directories registered with
//! [`PluginRegistry::register_plugin_path`]; each manifest entry names an
//! `implementation` whose factory was registered with
//! [`PluginRegistry::register_factory`].
//!
//! # Discovery rules
//!
//! 1. Manifests are read per directory in registration order, files sorted
//!    by name, skipping files that start with `_`.
//! 2. Only entries declared for the requested role are built.
//! 3. The first plug-in found under a name wins; later duplicates are
//!    logged and dropped.
//! 4. Directly registered plug-ins replace discovered ones of the same name.
//! 5. A manifest that fails is logged and skipped as a whole.
//! 6. A registered directory that does not exist fails discovery.
//! 7. The result is sorted by name.

pub mod compat;
pub mod creator;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod role;
pub mod traits;

pub use compat::{
    context_families, is_compatible_loader, loaders_by_representation, loaders_from_context,
    sort_by_order, WILDCARD,
};
pub use creator::{check_collision, CreatorInstance, INSTANCE_ID};
pub use error::{PluginError, PluginResult};
pub use loader::{LoaderContext, NodeHandle};
pub use manifest::{load_manifest, parse_manifest, PluginSpec};
pub use registry::{normalize_path, PluginFactory, PluginRegistry, MANIFEST_EXTENSION};
pub use role::PluginRole;
pub use traits::{Action, Creator, InventoryAction, Loader, Plugin, PluginHandle, SessionView};
