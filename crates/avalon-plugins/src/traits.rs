use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use avalon_types::Container;
use serde_json::Value;

use crate::creator::CreatorInstance;
use crate::error::{PluginError, PluginResult};
use crate::loader::{LoaderContext, NodeHandle};
use crate::role::PluginRole;

/// Read-only view of the session handed to actions.
pub type SessionView = BTreeMap<String, String>;

/// Metadata shared by every plug-in role.
pub trait Plugin: Send + Sync {
    /// Unique name within the role. Registration and discovery key on it.
    fn name(&self) -> &str;

    fn label(&self) -> &str {
        self.name()
    }

    /// Sort key; lower runs and lists first.
    fn order(&self) -> i32 {
        0
    }

    fn icon(&self) -> Option<&str> {
        None
    }

    fn color(&self) -> Option<&str> {
        None
    }
}

/// Loads a representation into the host scene.
///
/// A loader accepts representations whose family is listed in
/// [`families`](Loader::families) and whose name is listed in
/// [`representations`](Loader::representations). Either list may contain
/// `*` to accept anything.
pub trait Loader: Plugin {
    fn families(&self) -> &[String];

    fn representations(&self) -> &[String];

    /// Whether [`switch`](Loader::switch) is implemented.
    fn supports_switch(&self) -> bool {
        false
    }

    /// Import the representation into the scene and return the created
    /// host nodes. The default creates nothing.
    fn process(
        &self,
        context: &LoaderContext,
        name: &str,
        namespace: &str,
        options: &Value,
    ) -> PluginResult<Vec<NodeHandle>> {
        let _ = (context, name, namespace, options);
        Ok(Vec::new())
    }

    /// Point `container` at the representation in `context`.
    fn update(&self, container: &Container, context: &LoaderContext) -> PluginResult<()> {
        let _ = (container, context);
        Err(unsupported(self, "update"))
    }

    /// Delete `container` from the scene. Returns whether it was deleted.
    fn remove(&self, container: &Container) -> PluginResult<bool> {
        let _ = container;
        Err(unsupported(self, "remove"))
    }

    /// Replace `container` with a representation of a different subset.
    fn switch(&self, container: &Container, context: &LoaderContext) -> PluginResult<()> {
        let _ = (container, context);
        Err(unsupported(self, "switch"))
    }
}

fn unsupported<P: Plugin + ?Sized>(plugin: &P, operation: &'static str) -> PluginError {
    PluginError::Unsupported {
        plugin: plugin.name().to_string(),
        operation,
    }
}

/// Creates publishable instances in the host scene.
pub trait Creator: Plugin {
    /// The family every instance of this creator carries.
    fn family(&self) -> &str;

    /// Suggested subset names.
    fn defaults(&self) -> &[String] {
        &[]
    }

    /// Adjust the instance before the host creates it. The default keeps
    /// the merged payload as is.
    fn process(&self, instance: &mut CreatorInstance) -> PluginResult<()> {
        let _ = instance;
        Ok(())
    }
}

/// A session-level action, e.g. launching an application.
pub trait Action: Plugin {
    fn is_compatible(&self, session: &SessionView) -> bool {
        let _ = session;
        true
    }

    fn process(&self, session: &SessionView) -> PluginResult<()>;
}

/// An action run on containers from the scene inventory.
pub trait InventoryAction: Plugin {
    /// By default an action applies to containers backed by a host node.
    fn is_compatible(&self, container: &Container) -> bool {
        container.object_name.is_some()
    }

    /// Run on `containers`. Receives every container, compatible or not.
    fn process(&self, containers: &[Container]) -> PluginResult<Value>;
}

/// A registered plug-in of any role.
#[derive(Clone)]
pub enum PluginHandle {
    Loader(Arc<dyn Loader>),
    Creator(Arc<dyn Creator>),
    Action(Arc<dyn Action>),
    InventoryAction(Arc<dyn InventoryAction>),
}

impl PluginHandle {
    pub fn loader(loader: impl Loader + 'static) -> Self {
        Self::Loader(Arc::new(loader))
    }

    pub fn creator(creator: impl Creator + 'static) -> Self {
        Self::Creator(Arc::new(creator))
    }

    pub fn action(action: impl Action + 'static) -> Self {
        Self::Action(Arc::new(action))
    }

    pub fn inventory_action(action: impl InventoryAction + 'static) -> Self {
        Self::InventoryAction(Arc::new(action))
    }

    pub fn role(&self) -> PluginRole {
        match self {
            Self::Loader(_) => PluginRole::Loader,
            Self::Creator(_) => PluginRole::Creator,
            Self::Action(_) => PluginRole::Action,
            Self::InventoryAction(_) => PluginRole::InventoryAction,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Loader(p) => p.name(),
            Self::Creator(p) => p.name(),
            Self::Action(p) => p.name(),
            Self::InventoryAction(p) => p.name(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Loader(p) => p.label(),
            Self::Creator(p) => p.label(),
            Self::Action(p) => p.label(),
            Self::InventoryAction(p) => p.label(),
        }
    }

    pub fn order(&self) -> i32 {
        match self {
            Self::Loader(p) => p.order(),
            Self::Creator(p) => p.order(),
            Self::Action(p) => p.order(),
            Self::InventoryAction(p) => p.order(),
        }
    }

    pub fn as_loader(&self) -> Option<&Arc<dyn Loader>> {
        match self {
            Self::Loader(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_creator(&self) -> Option<&Arc<dyn Creator>> {
        match self {
            Self::Creator(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&Arc<dyn Action>> {
        match self {
            Self::Action(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_inventory_action(&self) -> Option<&Arc<dyn InventoryAction>> {
        match self {
            Self::InventoryAction(p) => Some(p),
            _ => None,
        }
    }

    /// Whether both handles share the same implementation instance.
    pub fn ptr_eq(&self, other: &PluginHandle) -> bool {
        match (self, other) {
            (Self::Loader(a), Self::Loader(b)) => Arc::ptr_eq(a, b),
            (Self::Creator(a), Self::Creator(b)) => Arc::ptr_eq(a, b),
            (Self::Action(a), Self::Action(b)) => Arc::ptr_eq(a, b),
            (Self::InventoryAction(a), Self::InventoryAction(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("role", &self.role())
            .field("name", &self.name())
            .field("order", &self.order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avalon_types::DocumentId;

    struct Bare;

    impl Plugin for Bare {
        fn name(&self) -> &str {
            "Bare"
        }
    }

    impl Loader for Bare {
        fn families(&self) -> &[String] {
            &[]
        }
        fn representations(&self) -> &[String] {
            &[]
        }
    }

    impl InventoryAction for Bare {
        fn process(&self, containers: &[Container]) -> PluginResult<Value> {
            Ok(Value::from(containers.len()))
        }
    }

    #[test]
    fn loader_defaults() {
        let container = Container::new("a", "_a_", "Bare", DocumentId::new());
        assert!(!Bare.supports_switch());
        assert!(matches!(
            Loader::remove(&Bare, &container),
            Err(PluginError::Unsupported { operation: "remove", .. })
        ));
        assert_eq!(Bare.label(), "Bare");
    }

    #[test]
    fn inventory_actions_default_to_containers_with_nodes() {
        let bare = Container::new("a", "_a_", "Bare", DocumentId::new());
        let backed = bare.clone().with_object_name("a_CON");
        assert!(!InventoryAction::is_compatible(&Bare, &bare));
        assert!(InventoryAction::is_compatible(&Bare, &backed));
    }

    #[test]
    fn handles_expose_role_and_name() {
        let handle = PluginHandle::loader(Bare);
        assert_eq!(handle.role(), PluginRole::Loader);
        assert_eq!(handle.name(), "Bare");
        assert!(handle.as_loader().is_some());
        assert!(handle.as_creator().is_none());
        assert!(handle.ptr_eq(&handle.clone()));
        assert!(!handle.ptr_eq(&PluginHandle::inventory_action(Bare)));
    }
}
