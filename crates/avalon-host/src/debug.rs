use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use avalon_plugins::{check_collision, Loader, LoaderContext};
use avalon_types::{Container, DocumentId};
use serde_json::{Map, Value};
use tracing::info;

use crate::contract::Interface;
use crate::error::{HostError, HostResult};
use crate::traits::{Config, ConfigHostHooks, Host};

/// Representation referenced by the first fixture container.
pub const FIXTURE_REPRESENTATION_1: DocumentId = DocumentId::from_u128(0xee_f7a0_0001);

/// Representation referenced by the second fixture container.
pub const FIXTURE_REPRESENTATION_2: DocumentId = DocumentId::from_u128(0xaa_bc50_0002);

#[derive(Debug, Default)]
struct Scene {
    containers: Vec<Container>,
    instances: Vec<(String, Map<String, Value>)>,
    publishes: u32,
}

/// A host without an application behind it.
///
/// Implements the whole host surface against an in-memory scene, logging
/// every call. Starts with two fixture containers, `Bruce01` and `Bruce02`.
pub struct DebugHost {
    scene: RwLock<Scene>,
    hooks: RwLock<Option<Arc<dyn ConfigHostHooks>>>,
}

impl DebugHost {
    pub fn new() -> Self {
        let fixtures = vec![
            Container::new("Bruce01", "_bruce01_", "DebugLoader", FIXTURE_REPRESENTATION_1)
                .with_object_name("Bruce01_node")
                .with_data("version", Value::from(3)),
            Container::new("Bruce02", "_bruce02_", "DebugLoader", FIXTURE_REPRESENTATION_2)
                .with_object_name("Bruce02_node")
                .with_data("version", Value::from(2)),
        ];
        Self::with_containers(fixtures)
    }

    /// A debug host whose scene starts empty.
    pub fn empty() -> Self {
        Self::with_containers(Vec::new())
    }

    fn with_containers(containers: Vec<Container>) -> Self {
        Self {
            scene: RwLock::new(Scene {
                containers,
                ..Scene::default()
            }),
            hooks: RwLock::new(None),
        }
    }

    /// Names of the instances created so far.
    pub fn instances(&self) -> Vec<String> {
        self.read()
            .map(|scene| scene.instances.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Data of instance `name`.
    pub fn instance(&self, name: &str) -> Option<Map<String, Value>> {
        let scene = self.read().ok()?;
        scene
            .instances
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.clone())
    }

    /// Whether config host hooks are attached.
    pub fn has_hooks(&self) -> bool {
        self.hooks().is_some()
    }

    /// Number of `publish` calls.
    pub fn publish_count(&self) -> u32 {
        self.read().map(|scene| scene.publishes).unwrap_or(0)
    }

    fn read(&self) -> HostResult<RwLockReadGuard<'_, Scene>> {
        self.scene.read().map_err(|_| HostError::LockPoisoned)
    }

    fn write(&self) -> HostResult<RwLockWriteGuard<'_, Scene>> {
        self.scene.write().map_err(|_| HostError::LockPoisoned)
    }

    fn hooks(&self) -> Option<Arc<dyn ConfigHostHooks>> {
        self.hooks.read().ok().and_then(|hooks| hooks.clone())
    }

    fn position(scene: &Scene, container: &Container) -> HostResult<usize> {
        scene
            .containers
            .iter()
            .position(|c| c.name == container.name && c.namespace == container.namespace)
            .ok_or_else(|| HostError::ContainerNotFound {
                name: container.name.clone(),
                namespace: container.namespace.clone(),
            })
    }

    /// Loaders run without the scene lock held, so the container is looked
    /// up again before it is replaced.
    fn replace(&self, container: &Container, replacement: Container) -> HostResult<()> {
        let mut scene = self.write()?;
        let index = Self::position(&scene, container)?;
        scene.containers[index] = replacement;
        Ok(())
    }

    fn repoint(container: &Container, context: &LoaderContext) -> Container {
        let mut moved = container.clone();
        moved.representation = context.context.representation.id;
        moved
            .data
            .insert("version".into(), Value::from(context.context.version.name));
        moved
    }
}

impl Default for DebugHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DebugHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugHost")
            .field("containers", &self.ls().map(|c| c.len()).unwrap_or(0))
            .field("instances", &self.instances())
            .finish()
    }
}

impl Host for DebugHost {
    fn name(&self) -> &str {
        "debugHost"
    }

    fn interface(&self) -> Interface {
        Interface::new()
            .member("install", &["config"])
            .member("uninstall", &[])
            .member("ls", &[])
            .member("load", &["loader", "representation", "name", "namespace", "options"])
            .member("create", &["name", "family", "asset", "options", "data"])
            .member("update", &["container", "version"])
            .member("remove", &["container"])
            .member("publish", &[])
    }

    fn install(&self, config: &dyn Config) -> HostResult<()> {
        let mut slot = self.hooks.write().map_err(|_| HostError::LockPoisoned)?;
        *slot = config.host_hooks(self.name());
        info!(host = self.name(), config = config.name(), "installed");
        Ok(())
    }

    fn uninstall(&self) -> HostResult<()> {
        let mut slot = self.hooks.write().map_err(|_| HostError::LockPoisoned)?;
        *slot = None;
        info!(host = self.name(), "uninstalled");
        Ok(())
    }

    fn ls(&self) -> HostResult<Vec<Container>> {
        Ok(self.read()?.containers.clone())
    }

    fn load(
        &self,
        loader: &dyn Loader,
        representation: &LoaderContext,
        name: &str,
        namespace: &str,
        options: &Value,
    ) -> HostResult<Container> {
        info!(
            host = self.name(),
            loader = loader.name(),
            name,
            namespace,
            fname = %representation.fname,
            "load"
        );
        let nodes = loader.process(representation, name, namespace, options)?;
        let mut container = Container::new(
            name,
            namespace,
            loader.name(),
            representation.context.representation.id,
        )
        .with_object_name(format!("{namespace}:{name}"))
        .with_data("nodes", Value::from(nodes))
        .with_data("version", Value::from(representation.context.version.name));

        if let Some(hooks) = self.hooks() {
            let metadata = hooks.collect_container_metadata(&container);
            container.data.extend(metadata);
        }

        self.write()?.containers.push(container.clone());
        Ok(container)
    }

    fn create(
        &self,
        name: &str,
        family: &str,
        asset: &str,
        options: &Value,
        data: &Map<String, Value>,
    ) -> HostResult<String> {
        info!(host = self.name(), name, family, asset, "create");
        let mut scene = self.write()?;
        check_collision(scene.instances.iter().map(|(n, _)| n.as_str()), name)?;
        let mut stored = data.clone();
        if !options.is_null() {
            stored.insert("options".into(), options.clone());
        }
        scene.instances.push((name.to_string(), stored));
        Ok(name.to_string())
    }

    fn update(
        &self,
        container: &Container,
        version: &LoaderContext,
        loader: &dyn Loader,
    ) -> HostResult<Container> {
        info!(
            host = self.name(),
            container = %container.name,
            version = version.context.version.name,
            "update"
        );
        Self::position(&*self.read()?, container)?;
        loader.update(container, version)?;
        let updated = Self::repoint(container, version);
        self.replace(container, updated.clone())?;
        Ok(updated)
    }

    fn remove(&self, container: &Container, loader: &dyn Loader) -> HostResult<bool> {
        info!(host = self.name(), container = %container.name, "remove");
        Self::position(&*self.read()?, container)?;
        let removed = loader.remove(container)?;
        if removed {
            let mut scene = self.write()?;
            let index = Self::position(&scene, container)?;
            scene.containers.remove(index);
        }
        Ok(removed)
    }

    fn switch(
        &self,
        container: &Container,
        representation: &LoaderContext,
        loader: &dyn Loader,
    ) -> HostResult<Container> {
        info!(
            host = self.name(),
            container = %container.name,
            subset = representation.subset_name(),
            "switch"
        );
        Self::position(&*self.read()?, container)?;
        loader.switch(container, representation)?;
        let switched = Self::repoint(container, representation);
        self.replace(container, switched.clone())?;
        Ok(switched)
    }

    fn publish(&self) -> HostResult<()> {
        let mut scene = self.write()?;
        scene.publishes += 1;
        info!(host = self.name(), instances = scene.instances.len(), "publish");
        Ok(())
    }
}
