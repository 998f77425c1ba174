use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use avalon_types::validate_identifier;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{PluginError, PluginResult};
use crate::manifest::{load_manifest, PluginSpec};
use crate::role::PluginRole;
use crate::traits::{Action, Creator, InventoryAction, Loader, PluginHandle};

/// Builds a plug-in from its manifest entry.
pub type PluginFactory = Arc<dyn Fn(&PluginSpec) -> PluginResult<PluginHandle> + Send + Sync>;

/// Default extension of plug-in manifests.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Per-role plug-in registrations and discovery paths.
///
/// Two sources feed [`discover`](PluginRegistry::discover):
///
/// 1. Directories registered with `register_plugin_path`. Every top-level
///    manifest in them (files starting with `_` are skipped) is read, and
///    its entries for the requested role are built through the factory
///    registered for their `implementation`.
/// 2. Plug-ins registered directly with `register_plugin`, which override
///    discovered plug-ins of the same name.
pub struct PluginRegistry {
    plugins: BTreeMap<PluginRole, BTreeMap<String, PluginHandle>>,
    paths: BTreeMap<PluginRole, Vec<PathBuf>>,
    factories: BTreeMap<String, PluginFactory>,
    manifest_extension: String,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::with_manifest_extension(MANIFEST_EXTENSION)
    }

    /// A registry reading manifests with a custom file extension.
    pub fn with_manifest_extension(extension: impl Into<String>) -> Self {
        Self {
            plugins: BTreeMap::new(),
            paths: BTreeMap::new(),
            factories: BTreeMap::new(),
            manifest_extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Direct registration
    // -----------------------------------------------------------------------

    /// Register a plug-in, replacing any registered plug-in of the same role
    /// and name.
    pub fn register_plugin(&mut self, plugin: PluginHandle) -> PluginResult<()> {
        validate_identifier(plugin.name())?;
        let role = plugin.role();
        let name = plugin.name().to_string();
        let previous = self
            .plugins
            .entry(role)
            .or_default()
            .insert(name.clone(), plugin);
        if previous.is_some() {
            debug!(%role, %name, "replaced registered plug-in");
        } else {
            debug!(%role, %name, "registered plug-in");
        }
        Ok(())
    }

    /// Remove a directly registered plug-in.
    pub fn deregister_plugin(&mut self, role: PluginRole, name: &str) -> Option<PluginHandle> {
        let removed = self.plugins.get_mut(&role)?.remove(name);
        if removed.is_some() {
            debug!(%role, name, "deregistered plug-in");
        }
        removed
    }

    /// Directly registered plug-ins per role, sorted by name.
    pub fn registered_plugins(&self) -> BTreeMap<PluginRole, Vec<PluginHandle>> {
        self.plugins
            .iter()
            .map(|(role, plugins)| (*role, plugins.values().cloned().collect()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Discovery paths
    // -----------------------------------------------------------------------

    /// Add a discovery directory for `role`. Registering the same path
    /// twice keeps one entry. Returns the normalized path.
    pub fn register_plugin_path(&mut self, role: PluginRole, path: impl AsRef<Path>) -> PathBuf {
        let path = normalize_path(path.as_ref());
        let paths = self.paths.entry(role).or_default();
        if !paths.contains(&path) {
            info!(%role, path = %path.display(), "registered plug-in path");
            paths.push(path.clone());
        }
        path
    }

    /// Remove a discovery directory. Returns whether it was registered.
    pub fn deregister_plugin_path(&mut self, role: PluginRole, path: impl AsRef<Path>) -> bool {
        let path = normalize_path(path.as_ref());
        let Some(paths) = self.paths.get_mut(&role) else {
            return false;
        };
        let before = paths.len();
        paths.retain(|p| *p != path);
        let removed = paths.len() != before;
        if removed {
            info!(%role, path = %path.display(), "deregistered plug-in path");
        }
        removed
    }

    /// Discovery directories per role, in registration order.
    pub fn registered_plugin_paths(&self) -> BTreeMap<PluginRole, Vec<PathBuf>> {
        self.paths.clone()
    }

    // -----------------------------------------------------------------------
    // Factories
    // -----------------------------------------------------------------------

    /// Make `implementation` available to manifests.
    pub fn register_factory<F>(&mut self, implementation: impl Into<String>, factory: F)
    where
        F: Fn(&PluginSpec) -> PluginResult<PluginHandle> + Send + Sync + 'static,
    {
        let implementation = implementation.into();
        debug!(%implementation, "registered plug-in factory");
        self.factories.insert(implementation, Arc::new(factory));
    }

    pub fn deregister_factory(&mut self, implementation: &str) -> bool {
        self.factories.remove(implementation).is_some()
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Every plug-in of `role`, sorted by name.
    ///
    /// A manifest that fails to read, parse or build is logged and skipped.
    /// A discovery path that is not a directory fails the whole call.
    pub fn discover(&self, role: PluginRole) -> PluginResult<Vec<PluginHandle>> {
        let mut found: BTreeMap<String, PluginHandle> = BTreeMap::new();

        for dir in self.paths.get(&role).into_iter().flatten() {
            if !dir.is_dir() {
                return Err(PluginError::MissingPath(dir.clone()));
            }
            for manifest in self.manifests_in(dir) {
                let plugins = match self.plugins_from_manifest(&manifest, role) {
                    Ok(plugins) => plugins,
                    Err(err) => {
                        warn!(path = %manifest.display(), error = %err, "skipped plug-in manifest");
                        continue;
                    }
                };
                for plugin in plugins {
                    let name = plugin.name().to_string();
                    if found.contains_key(&name) {
                        warn!(
                            %role,
                            %name,
                            path = %manifest.display(),
                            "duplicate plug-in name; keeping the first one found"
                        );
                        continue;
                    }
                    found.insert(name, plugin);
                }
            }
        }

        if let Some(registered) = self.plugins.get(&role) {
            for (name, plugin) in registered {
                found.insert(name.clone(), plugin.clone());
            }
        }

        debug!(%role, count = found.len(), "discovered plug-ins");
        Ok(found.into_values().collect())
    }

    pub fn discover_loaders(&self) -> PluginResult<Vec<Arc<dyn Loader>>> {
        Ok(self
            .discover(PluginRole::Loader)?
            .iter()
            .filter_map(|p| p.as_loader().cloned())
            .collect())
    }

    pub fn discover_creators(&self) -> PluginResult<Vec<Arc<dyn Creator>>> {
        Ok(self
            .discover(PluginRole::Creator)?
            .iter()
            .filter_map(|p| p.as_creator().cloned())
            .collect())
    }

    pub fn discover_actions(&self) -> PluginResult<Vec<Arc<dyn Action>>> {
        Ok(self
            .discover(PluginRole::Action)?
            .iter()
            .filter_map(|p| p.as_action().cloned())
            .collect())
    }

    pub fn discover_inventory_actions(&self) -> PluginResult<Vec<Arc<dyn InventoryAction>>> {
        Ok(self
            .discover(PluginRole::InventoryAction)?
            .iter()
            .filter_map(|p| p.as_inventory_action().cloned())
            .collect())
    }

    /// Top-level manifests of `dir`, sorted by file name.
    fn manifests_in(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "could not read plug-in directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('_'))
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.to_string_lossy() == self.manifest_extension)
            })
            .collect()
    }

    /// Build every entry of `manifest` declared for `role`.
    ///
    /// Any failure rejects the whole manifest.
    fn plugins_from_manifest(&self, manifest: &Path, role: PluginRole) -> PluginResult<Vec<PluginHandle>> {
        let mut plugins = Vec::new();
        for spec in load_manifest(manifest)? {
            if spec.role != role {
                continue;
            }
            let factory = self.factories.get(&spec.implementation).ok_or_else(|| {
                PluginError::UnknownImplementation {
                    path: manifest.to_path_buf(),
                    implementation: spec.implementation.clone(),
                }
            })?;
            let plugin = factory(&spec)?;
            if plugin.role() != role {
                return Err(PluginError::RoleMismatch {
                    name: spec.name,
                    expected: role,
                    actual: plugin.role(),
                });
            }
            if plugin.name() != spec.name {
                warn!(
                    declared = %spec.name,
                    built = plugin.name(),
                    "factory built a plug-in under a different name"
                );
            }
            plugins.push(plugin);
        }
        Ok(plugins)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins)
            .field("paths", &self.paths)
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("manifest_extension", &self.manifest_extension)
            .finish()
    }
}

/// Lexically normalize `path`: drop `.` components and fold `..` into the
/// preceding component. The filesystem is not consulted.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
