//! Scene operations: create, load, update, switch, remove and publish.
//!
//! Each operation resolves what it needs from the store and the plug-in
//! registry, emits `before_<operation>`, hands the scene mutation to the
//! registered host and emits `after_<operation>`.

use std::sync::Arc;

use avalon_events::{AFTER_PREFIX, BEFORE_PREFIX};
use avalon_plugins::{
    is_compatible_loader, loaders_from_context, sort_by_order, Action, CreatorInstance,
    InventoryAction, Loader, LoaderContext,
};
use avalon_store::{
    find_representation, find_version, representation_context, RepresentationContext,
    VersionSelector,
};
use avalon_types::{validate_subset_name, Container, DocumentId, TemplateData};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::kernel::PipelineKernel;
use crate::session::{AVALON_APP, AVALON_INSTANCE_ID, AVALON_TASK, AVALON_USER};

impl PipelineKernel {
    /// Create a publish instance named `name` for `asset`.
    ///
    /// Every discovered creator of `family` processes the instance in
    /// order; one that fails is logged and skipped. The host then creates
    /// the instance once. Returns the instance name.
    pub fn create(
        &self,
        name: &str,
        asset: &str,
        family: &str,
        options: Value,
        data: Map<String, Value>,
    ) -> PipelineResult<String> {
        validate_subset_name(name)?;
        let instance_id = self
            .session
            .value(AVALON_INSTANCE_ID)
            .unwrap_or(self.settings.instance_id.as_str())
            .to_string();
        let mut instance = CreatorInstance::new(&instance_id, family, name, asset, options, data);

        let mut creators = self.registry.discover_creators()?;
        sort_by_order(&mut creators);
        let mut ran = 0;
        for creator in creators.iter().filter(|c| c.family() == family) {
            info!(creator = creator.name(), name, asset, "creating instance");
            let mut candidate = instance.clone();
            match creator.process(&mut candidate) {
                Ok(()) => {
                    instance = candidate;
                    ran += 1;
                }
                Err(err) => warn!(creator = creator.name(), error = %err, "creator failed"),
            }
        }
        if ran == 0 {
            return Err(PipelineError::NoCreator(family.to_string()));
        }

        let args = json!({"name": name, "asset": asset, "family": family});
        self.emit(&format!("{BEFORE_PREFIX}create"), &args);
        let created = self.host.create(
            &instance.name,
            &instance.family,
            &instance.asset,
            &instance.options,
            &instance.data,
        )?;
        self.emit(&format!("{AFTER_PREFIX}create"), &json!({"instance": created}));
        Ok(created)
    }

    /// Load `representation` with `loader`.
    ///
    /// `name` defaults to the subset name, `namespace` to the asset name
    /// followed by `_`, and `options` to an empty object.
    pub fn load(
        &self,
        loader: &dyn Loader,
        representation: DocumentId,
        name: Option<&str>,
        namespace: Option<&str>,
        options: Option<Value>,
    ) -> PipelineResult<Container> {
        let context = representation_context(self.store.as_ref(), representation)?;
        if !is_compatible_loader(loader, &context) {
            return Err(PipelineError::IncompatibleLoader {
                loader: loader.name().to_string(),
                subset: context.subset.name.clone(),
            });
        }

        let options = options.unwrap_or_else(|| Value::Object(Map::new()));
        let name = name.map_or_else(|| context.subset.name.clone(), str::to_string);
        let namespace = namespace.map_or_else(|| format!("{}_", context.asset.name), str::to_string);
        info!(loader = loader.name(), asset = %context.asset.name, %name, "loading representation");

        let loader_context = self.loader_context(context)?;
        let args = json!({
            "loader": loader.name(),
            "representation": representation,
            "name": name,
            "namespace": namespace,
        });
        self.emit(&format!("{BEFORE_PREFIX}load"), &args);
        let container = self
            .host
            .load(loader, &loader_context, &name, &namespace, &options)?;
        self.emit(&format!("{AFTER_PREFIX}load"), &container_value(&container));
        Ok(container)
    }

    /// Point `container` at another version of its subset, keeping the
    /// representation name.
    pub fn update(&self, container: &Container, version: VersionSelector) -> PipelineResult<Container> {
        let store = self.store.as_ref();
        let current = representation_context(store, container.representation)?;
        let target = find_version(store, current.subset.id, version)?.ok_or_else(|| {
            PipelineError::NotFound {
                kind: "version",
                what: format!("{version} of subset {:?}", current.subset.name),
            }
        })?;
        let representation = find_representation(store, target.id, &current.representation.name)?
            .ok_or_else(|| PipelineError::NotFound {
                kind: "representation",
                what: format!(
                    "{:?} of {:?} v{:03}",
                    current.representation.name, current.subset.name, target.name
                ),
            })?;

        let loader = self.container_loader(container)?;
        let loader_context = self.loader_context(representation_context(store, representation.id)?)?;
        info!(
            container = %container.name,
            from = current.version.name,
            to = target.name,
            "updating container"
        );

        self.emit(&format!("{BEFORE_PREFIX}update"), &container_value(container));
        let updated = self.host.update(container, &loader_context, loader.as_ref())?;
        self.emit(&format!("{AFTER_PREFIX}update"), &container_value(&updated));
        Ok(updated)
    }

    /// Replace `container` with `representation`, usually of another subset.
    pub fn switch(&self, container: &Container, representation: DocumentId) -> PipelineResult<Container> {
        let loader = self.container_loader(container)?;
        if !loader.supports_switch() {
            return Err(PipelineError::SwitchUnsupported(loader.label().to_string()));
        }

        let context = representation_context(self.store.as_ref(), representation)?;
        if !is_compatible_loader(loader.as_ref(), &context) {
            return Err(PipelineError::IncompatibleLoader {
                loader: loader.name().to_string(),
                subset: context.subset.name.clone(),
            });
        }
        info!(container = %container.name, subset = %context.subset.name, "switching container");

        let loader_context = self.loader_context(context)?;
        self.emit(&format!("{BEFORE_PREFIX}switch"), &container_value(container));
        let switched = self.host.switch(container, &loader_context, loader.as_ref())?;
        self.emit(&format!("{AFTER_PREFIX}switch"), &container_value(&switched));
        Ok(switched)
    }

    /// Remove `container` from the scene.
    pub fn remove(&self, container: &Container) -> PipelineResult<bool> {
        let loader = self.container_loader(container)?;
        info!(container = %container.name, loader = loader.name(), "removing container");

        let args = container_value(container);
        self.emit(&format!("{BEFORE_PREFIX}remove"), &args);
        let removed = self.host.remove(container, loader.as_ref())?;
        self.emit(&format!("{AFTER_PREFIX}remove"), &args);
        Ok(removed)
    }

    /// Publish through the registered host.
    pub fn publish(&self) -> PipelineResult<()> {
        let args = json!({"host": self.host.name()});
        self.emit(&format!("{BEFORE_PREFIX}publish"), &args);
        self.host.publish()?;
        self.emit(&format!("{AFTER_PREFIX}publish"), &args);
        Ok(())
    }

    /// Discovered loaders compatible with `representation`, by order then
    /// name.
    pub fn compatible_loaders(&self, representation: DocumentId) -> PipelineResult<Vec<Arc<dyn Loader>>> {
        let context = representation_context(self.store.as_ref(), representation)?;
        let mut loaders = loaders_from_context(&self.registry.discover_loaders()?, &context);
        sort_by_order(&mut loaders);
        Ok(loaders)
    }

    /// Discovered actions compatible with the current session.
    pub fn compatible_actions(&self) -> PipelineResult<Vec<Arc<dyn Action>>> {
        let session = self.session.view();
        let mut actions: Vec<_> = self
            .registry
            .discover_actions()?
            .into_iter()
            .filter(|action| action.is_compatible(&session))
            .collect();
        sort_by_order(&mut actions);
        Ok(actions)
    }

    /// Discovered inventory actions compatible with `container`.
    pub fn compatible_inventory_actions(
        &self,
        container: &Container,
    ) -> PipelineResult<Vec<Arc<dyn InventoryAction>>> {
        let mut actions: Vec<_> = self
            .registry
            .discover_inventory_actions()?
            .into_iter()
            .filter(|action| action.is_compatible(container))
            .collect();
        sort_by_order(&mut actions);
        Ok(actions)
    }

    /// The discovered loader that created `container`.
    fn container_loader(&self, container: &Container) -> PipelineResult<Arc<dyn Loader>> {
        self.registry
            .discover_loaders()?
            .into_iter()
            .find(|loader| loader.name() == container.loader)
            .ok_or_else(|| {
                warn!(container = %container.name, loader = %container.loader, "container loader not found");
                PipelineError::LoaderNotFound(container.loader.clone())
            })
    }

    pub(crate) fn loader_context(&self, context: RepresentationContext) -> PipelineResult<LoaderContext> {
        Ok(LoaderContext::new(
            context,
            &self.registered_root(),
            &self.session_template_data(),
        )?)
    }

    /// Session values available to path templates besides the context.
    pub(crate) fn session_template_data(&self) -> TemplateData {
        let mut data = TemplateData::new();
        data.insert("user".into(), self.user());
        data.insert(
            "app".into(),
            self.session.get(AVALON_APP).unwrap_or_default().to_string(),
        );
        data.insert(
            "task".into(),
            self.session.get(AVALON_TASK).unwrap_or_default().to_string(),
        );
        data
    }

    /// `AVALON_USER`, else the login name from the environment.
    pub(crate) fn user(&self) -> String {
        self.session
            .value(AVALON_USER)
            .or_else(|| self.environment.get("USER"))
            .or_else(|| self.environment.get("USERNAME"))
            .unwrap_or_default()
            .to_string()
    }
}

fn container_value(container: &Container) -> Value {
    serde_json::to_value(container).unwrap_or(Value::Null)
}
