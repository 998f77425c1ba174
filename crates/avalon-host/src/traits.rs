use std::sync::Arc;

use avalon_plugins::{Loader, LoaderContext};
use avalon_types::Container;
use serde_json::{Map, Value};

use crate::contract::{Interface, CONFIG_CONTRACT};
use crate::error::{HostError, HostResult};

/// A host application adapter.
///
/// The five contract members are `ls`, `load`, `create`, `update` and
/// `remove`; a host declares which it implements through
/// [`interface`](Host::interface), and the kernel refuses hosts whose
/// declaration falls short. `install`, `uninstall` and `publish` are
/// optional hooks, called only when declared.
pub trait Host: Send + Sync {
    fn name(&self) -> &str;

    /// Members this host implements and their parameter names.
    fn interface(&self) -> Interface;

    /// Wire host-specific menus and callbacks for `config`.
    fn install(&self, config: &dyn Config) -> HostResult<()> {
        let _ = config;
        Ok(())
    }

    fn uninstall(&self) -> HostResult<()> {
        Ok(())
    }

    /// Containers present in the scene.
    fn ls(&self) -> HostResult<Vec<Container>>;

    /// Load a representation with `loader` and containerise the result.
    fn load(
        &self,
        loader: &dyn Loader,
        representation: &LoaderContext,
        name: &str,
        namespace: &str,
        options: &Value,
    ) -> HostResult<Container> {
        let _ = (loader, representation, name, namespace, options);
        Err(unsupported(self, "load"))
    }

    /// Create a publish instance. Returns the instance name.
    fn create(
        &self,
        name: &str,
        family: &str,
        asset: &str,
        options: &Value,
        data: &Map<String, Value>,
    ) -> HostResult<String> {
        let _ = (name, family, asset, options, data);
        Err(unsupported(self, "create"))
    }

    /// Point `container` at the representation in `version`.
    fn update(
        &self,
        container: &Container,
        version: &LoaderContext,
        loader: &dyn Loader,
    ) -> HostResult<Container> {
        let _ = (container, version, loader);
        Err(unsupported(self, "update"))
    }

    /// Remove `container` from the scene.
    fn remove(&self, container: &Container, loader: &dyn Loader) -> HostResult<bool> {
        let _ = (container, loader);
        Err(unsupported(self, "remove"))
    }

    /// Replace `container` with a representation of another subset.
    ///
    /// The default delegates to the loader and returns the container
    /// pointing at the new representation.
    fn switch(
        &self,
        container: &Container,
        representation: &LoaderContext,
        loader: &dyn Loader,
    ) -> HostResult<Container> {
        loader.switch(container, representation)?;
        let mut switched = container.clone();
        switched.representation = representation.context.representation.id;
        Ok(switched)
    }

    /// Publish the scene's instances.
    fn publish(&self) -> HostResult<()> {
        Err(unsupported(self, "publish"))
    }
}

fn unsupported<H: Host + ?Sized>(host: &H, operation: &'static str) -> HostError {
    HostError::Unsupported {
        host: host.name().to_string(),
        operation,
    }
}

/// A studio pipeline configuration.
pub trait Config: Send + Sync {
    fn name(&self) -> &str;

    /// Members this config implements.
    fn interface(&self) -> Interface {
        CONFIG_CONTRACT
            .iter()
            .fold(Interface::new(), |interface, (member, params)| {
                interface.member(member, params)
            })
    }

    fn install(&self) -> HostResult<()>;

    fn uninstall(&self) -> HostResult<()>;

    /// Hooks specific to the host named `host_name`, if the config has any.
    fn host_hooks(&self, host_name: &str) -> Option<Arc<dyn ConfigHostHooks>> {
        let _ = host_name;
        None
    }
}

/// Per-host extensions of a config.
pub trait ConfigHostHooks: Send + Sync {
    fn install(&self) -> HostResult<()> {
        Ok(())
    }

    fn uninstall(&self) -> HostResult<()> {
        Ok(())
    }

    /// Extra data a host stores on containers it creates.
    fn collect_container_metadata(&self, container: &Container) -> Map<String, Value> {
        let _ = container;
        Map::new()
    }
}
