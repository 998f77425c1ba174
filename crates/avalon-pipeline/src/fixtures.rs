//! Shared test fixtures: a seeded store, plug-ins, a config and kernels.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use avalon_host::{Config, ConfigHostHooks, DebugHost, Host, HostError, HostResult, Interface};
use avalon_plugins::{
    Creator, CreatorInstance, Loader, LoaderContext, NodeHandle, Plugin, PluginError, PluginHandle,
    PluginResult,
};
use avalon_store::{find_document, DocumentStore, Filter, InMemoryDocumentStore};
use avalon_types::{
    Asset, Container, Document, DocumentId, Project, Representation, Subset, Version,
};
use serde_json::{Map, Value};

use crate::environment::Environment;
use crate::kernel::PipelineKernel;

pub fn environment() -> Environment {
    Environment::new()
        .with("AVALON_PROJECTS", "/projects")
        .with("AVALON_PROJECT", "batman")
        .with("AVALON_ASSET", "bruce")
        .with("AVALON_SILO", "assets")
        .with("AVALON_TASK", "model")
        .with("AVALON_APP", "maya")
        .with("AVALON_CONFIG", "studio")
        .with("AVALON_USER", "wayne")
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Ids of the seeded documents.
pub struct Seed {
    pub model_v1: DocumentId,
    pub model_v1_ma: DocumentId,
    pub model_v1_abc: DocumentId,
    pub model_v2_ma: DocumentId,
    pub model_v2_abc: DocumentId,
    pub proxy_v1_ma: DocumentId,
    pub rig_v1_ma: DocumentId,
}

impl Seed {
    /// Populate project `batman` and leave the store disconnected.
    pub fn insert(store: &InMemoryDocumentStore, config_name: Option<&str>) -> Self {
        let mut project = Project::new("batman");
        project.config.name = config_name.map(str::to_string);
        let bruce = Asset::new("bruce", project.id).with_silo("assets");
        let characters = Asset::new("characters", project.id);
        let joker = Asset::new("joker", project.id)
            .with_visual_parent(characters.id, vec!["characters".into()]);

        let model = Subset::new("modelDefault", bruce.id).with_families(&["model"]);
        let proxy = Subset::new("modelProxy", bruce.id).with_families(&["model"]);
        let rig = Subset::new("rigDefault", bruce.id).with_families(&["rig"]);

        let model_v1 = Version::new(1, model.id).with_author("wayne");
        let model_v2 = Version::new(2, model.id).with_author("wayne");
        let proxy_v1 = Version::new(1, proxy.id);
        let rig_v1 = Version::new(1, rig.id);

        let model_v1_ma = Representation::new("ma", model_v1.id);
        let model_v1_abc = Representation::new("abc", model_v1.id);
        let model_v2_ma = Representation::new("ma", model_v2.id);
        let model_v2_abc = Representation::new("abc", model_v2.id);
        let proxy_v1_ma = Representation::new("ma", proxy_v1.id);
        let rig_v1_ma = Representation::new("ma", rig_v1.id);

        let seed = Self {
            model_v1: model_v1.id,
            model_v1_ma: model_v1_ma.id,
            model_v1_abc: model_v1_abc.id,
            model_v2_ma: model_v2_ma.id,
            model_v2_abc: model_v2_abc.id,
            proxy_v1_ma: proxy_v1_ma.id,
            rig_v1_ma: rig_v1_ma.id,
        };

        let docs: Vec<Document> = vec![
            project.into(),
            bruce.into(),
            characters.into(),
            joker.into(),
            model.into(),
            proxy.into(),
            rig.into(),
            model_v1.into(),
            model_v2.into(),
            proxy_v1.into(),
            rig_v1.into(),
            model_v1_ma.into(),
            model_v1_abc.into(),
            model_v2_ma.into(),
            model_v2_abc.into(),
            proxy_v1_ma.into(),
            rig_v1_ma.into(),
        ];
        store.install().unwrap();
        store.activate_project("batman").unwrap();
        store.insert_all(docs).unwrap();
        store.uninstall();
        seed
    }

    /// Read representation `id` back from the store.
    pub fn representation(&self, store: &dyn DocumentStore, id: DocumentId) -> Representation {
        find_document(store, &Filter::by_id(id))
            .unwrap()
            .and_then(Document::into_representation)
            .unwrap()
    }
}

// ---------------------------------------------------------------------------
// Plug-ins
// ---------------------------------------------------------------------------

pub struct ModelLoader {
    families: Vec<String>,
    representations: Vec<String>,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self {
            families: vec!["model".into()],
            representations: vec!["ma".into(), "abc".into()],
        }
    }
}

impl Plugin for ModelLoader {
    fn name(&self) -> &str {
        "ModelLoader"
    }
}

impl Loader for ModelLoader {
    fn families(&self) -> &[String] {
        &self.families
    }

    fn representations(&self) -> &[String] {
        &self.representations
    }

    fn supports_switch(&self) -> bool {
        true
    }

    fn process(
        &self,
        _context: &LoaderContext,
        name: &str,
        namespace: &str,
        _options: &Value,
    ) -> PluginResult<Vec<NodeHandle>> {
        Ok(vec![format!("{namespace}:{name}_GEO")])
    }

    fn update(&self, _container: &Container, _context: &LoaderContext) -> PluginResult<()> {
        Ok(())
    }

    fn remove(&self, _container: &Container) -> PluginResult<bool> {
        Ok(true)
    }

    fn switch(&self, _container: &Container, _context: &LoaderContext) -> PluginResult<()> {
        Ok(())
    }
}

/// Loads rigs; cannot switch.
pub struct RigLoader {
    families: Vec<String>,
    representations: Vec<String>,
}

impl RigLoader {
    pub fn new() -> Self {
        Self {
            families: vec!["rig".into()],
            representations: vec!["ma".into()],
        }
    }
}

impl Plugin for RigLoader {
    fn name(&self) -> &str {
        "RigLoader"
    }

    fn label(&self) -> &str {
        "Rig"
    }
}

impl Loader for RigLoader {
    fn families(&self) -> &[String] {
        &self.families
    }

    fn representations(&self) -> &[String] {
        &self.representations
    }
}

/// Creates model instances, or fails every time when `broken`.
pub struct ModelCreator {
    name: &'static str,
    broken: bool,
}

impl ModelCreator {
    pub fn new(name: &'static str, broken: bool) -> Self {
        Self { name, broken }
    }
}

impl Plugin for ModelCreator {
    fn name(&self) -> &str {
        self.name
    }
}

impl Creator for ModelCreator {
    fn family(&self) -> &str {
        "model"
    }

    fn process(&self, instance: &mut CreatorInstance) -> PluginResult<()> {
        if self.broken {
            return Err(PluginError::Failed {
                plugin: self.name.into(),
                reason: "no selection".into(),
            });
        }
        instance
            .data
            .insert("createdBy".into(), Value::from(self.name));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hosts and configs
// ---------------------------------------------------------------------------

/// Declares `ls` and a `load` lacking the loader parameter.
pub struct BrokenHost;

impl Host for BrokenHost {
    fn name(&self) -> &str {
        "brokenHost"
    }

    fn interface(&self) -> Interface {
        Interface::new()
            .member("ls", &[])
            .member("load", &["representation"])
    }

    fn ls(&self) -> HostResult<Vec<Container>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct StudioConfig {
    pub fail_install: AtomicBool,
    pub installs: AtomicUsize,
    pub uninstalls: AtomicUsize,
    pub hook_installs: Arc<AtomicUsize>,
    pub hook_uninstalls: Arc<AtomicUsize>,
}

struct StudioHooks {
    installs: Arc<AtomicUsize>,
    uninstalls: Arc<AtomicUsize>,
}

impl ConfigHostHooks for StudioHooks {
    fn install(&self) -> HostResult<()> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn uninstall(&self) -> HostResult<()> {
        self.uninstalls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn collect_container_metadata(&self, _container: &Container) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("studio".into(), Value::from("acme"));
        data
    }
}

impl Config for StudioConfig {
    fn name(&self) -> &str {
        "studio"
    }

    fn install(&self) -> HostResult<()> {
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(HostError::failed("studio", "install refused"));
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn uninstall(&self) -> HostResult<()> {
        self.uninstalls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn host_hooks(&self, host_name: &str) -> Option<Arc<dyn ConfigHostHooks>> {
        (host_name == "debugHost").then(|| {
            Arc::new(StudioHooks {
                installs: self.hook_installs.clone(),
                uninstalls: self.hook_uninstalls.clone(),
            }) as Arc<dyn ConfigHostHooks>
        })
    }
}

// ---------------------------------------------------------------------------
// Kernels
// ---------------------------------------------------------------------------

/// A kernel over a seeded store with the `studio` config provider and
/// [`ModelLoader`] registered. Not installed.
pub fn seeded_kernel() -> (PipelineKernel, Seed, Arc<StudioConfig>) {
    seeded_kernel_with(None)
}

/// Like [`seeded_kernel`], naming `config_name` in the project document.
pub fn seeded_kernel_with(config_name: Option<&str>) -> (PipelineKernel, Seed, Arc<StudioConfig>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let seed = Seed::insert(&store, config_name);
    let config = Arc::new(StudioConfig::default());

    let mut kernel = PipelineKernel::new(store).with_environment(environment());
    let provided = config.clone();
    kernel.register_config_provider("studio", move || Ok(provided.clone() as Arc<dyn Config>));
    kernel
        .registry_mut()
        .register_plugin(PluginHandle::loader(ModelLoader::new()))
        .unwrap();
    (kernel, seed, config)
}

/// A seeded kernel installed with a [`DebugHost`].
pub fn installed_kernel() -> (PipelineKernel, Seed, Arc<DebugHost>) {
    let (mut kernel, seed, _config) = seeded_kernel();
    let host = Arc::new(DebugHost::new());
    kernel.install(host.clone()).unwrap();
    (kernel, seed, host)
}
