//! The pipeline kernel: install/uninstall lifecycle and registration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use avalon_events::EventBus;
use avalon_host::{validate_config, validate_host, Config, ConfigHostHooks, DefaultHost, Host};
use avalon_plugins::PluginRegistry;
use avalon_store::{active_project, DocumentStore};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::environment::Environment;
use crate::error::{PipelineError, PipelineResult};
use crate::session::{Session, AVALON_CONFIG, AVALON_PROJECT, AVALON_PROJECTS, NO_CONFIG};
use crate::settings::KernelSettings;

/// Builds the pipeline config registered under a name.
pub type ConfigProvider = Arc<dyn Fn() -> PipelineResult<Arc<dyn Config>> + Send + Sync>;

/// Owns everything one process needs to run the pipeline.
///
/// There is exactly one registered host and at most one registered config
/// at any time. Until a host is registered, [`DefaultHost`] stands in.
pub struct PipelineKernel {
    pub(crate) settings: KernelSettings,
    pub(crate) environment: Environment,
    pub(crate) session: Session,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) registry: PluginRegistry,
    pub(crate) events: EventBus,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) config: Option<Arc<dyn Config>>,
    config_providers: BTreeMap<String, ConfigProvider>,
    root: Option<String>,
    installed: bool,
}

impl PipelineKernel {
    /// A kernel over `store`, reading the process environment.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let settings = KernelSettings::default();
        let environment = Environment::from_process();
        Self {
            session: Session::from_environment(&environment, &settings),
            registry: PluginRegistry::with_manifest_extension(settings.manifest_extension.clone()),
            settings,
            environment,
            store,
            events: EventBus::new(),
            host: Arc::new(DefaultHost),
            config: None,
            config_providers: BTreeMap::new(),
            root: None,
            installed: false,
        }
    }

    /// Replace the settings. Resets the session and the plug-in registry.
    pub fn with_settings(mut self, settings: KernelSettings) -> Self {
        self.registry = PluginRegistry::with_manifest_extension(settings.manifest_extension.clone());
        self.session = Session::from_environment(&self.environment, &settings);
        self.settings = settings;
        self
    }

    /// Replace the environment the session is read from.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.session = Session::from_environment(&environment, &self.settings);
        self.environment = environment;
        self
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Install `host`.
    ///
    /// Resets the session from the environment, connects to the store,
    /// resolves the project's config, validates host and config, runs their
    /// install hooks and only then registers both.
    ///
    /// An already installed kernel is uninstalled first, so a failed
    /// reinstall leaves [`DefaultHost`] and no config registered. On a first
    /// install failure the registrations are left as they were. Either way
    /// the store is disconnected and any install hook that already ran is
    /// undone.
    pub fn install(&mut self, host: Arc<dyn Host>) -> PipelineResult<()> {
        if self.installed {
            debug!("kernel already installed; reinstalling");
            self.uninstall()?;
        }

        self.session = Session::from_environment(&self.environment, &self.settings);
        let missing = self.session.missing(&self.settings.required_session_keys);
        if !missing.is_empty() {
            return Err(PipelineError::MissingSessionKeys(missing));
        }

        self.store.install()?;
        if let Err(err) = self.activate(host) {
            warn!(error = %err, "install failed");
            self.store.uninstall();
            return Err(err);
        }

        self.installed = true;
        info!(
            host = self.host.name(),
            config = %self.config.as_ref().map(|c| c.name().to_string()).unwrap_or_default(),
            "pipeline installed"
        );
        Ok(())
    }

    fn activate(&mut self, host: Arc<dyn Host>) -> PipelineResult<()> {
        let project = self.session.get(AVALON_PROJECT).unwrap_or_default().to_string();
        info!(%project, "activating project");
        self.store.activate_project(&project)?;

        let config = self.find_config()?;
        validate_host(host.as_ref())?;
        validate_config(config.as_ref())?;

        let host_hooked = host.interface().has("install");
        if host_hooked {
            host.install(config.as_ref())?;
        }
        let hooks = config.host_hooks(host.name());
        if let Some(hooks) = &hooks {
            if let Err(err) = hooks.install() {
                rollback(host.as_ref(), host_hooked, None);
                return Err(err.into());
            }
        }
        if let Err(err) = config.install() {
            rollback(host.as_ref(), host_hooked, hooks.as_deref());
            return Err(err.into());
        }

        self.session.set(AVALON_CONFIG, config.name());
        self.host = host;
        self.config = Some(config);
        Ok(())
    }

    /// Resolve the config named by the project document, falling back to
    /// `AVALON_CONFIG`.
    fn find_config(&self) -> PipelineResult<Arc<dyn Config>> {
        let from_project = active_project(self.store.as_ref())?
            .and_then(|project| project.config.name)
            .filter(|name| !name.is_empty());
        let name = from_project.or_else(|| {
            self.session
                .value(AVALON_CONFIG)
                .filter(|name| *name != NO_CONFIG)
                .map(str::to_string)
        });
        let Some(name) = name else {
            return Err(PipelineError::MissingSessionKeys(vec![AVALON_CONFIG.into()]));
        };

        let provider = self
            .config_providers
            .get(&name)
            .ok_or_else(|| PipelineError::ConfigNotFound(name.clone()))?;
        info!(config = %name, "loading pipeline config");
        provider()
    }

    /// Undo [`install`](Self::install).
    ///
    /// Every teardown step runs even if an earlier one fails; the first
    /// failure is returned. Does nothing when not installed.
    pub fn uninstall(&mut self) -> PipelineResult<()> {
        if !self.installed {
            return Ok(());
        }

        let mut first_error = None;
        let mut record = |step: &str, result: PipelineResult<()>| {
            if let Err(err) = result {
                warn!(step, error = %err, "uninstall step failed");
                first_error.get_or_insert(err);
            }
        };

        let host = self.host.clone();
        if let Some(config) = self.config.clone() {
            if let Some(hooks) = config.host_hooks(host.name()) {
                record("config host hooks", hooks.uninstall().map_err(Into::into));
            }
        }
        if host.interface().has("uninstall") {
            record("host", host.uninstall().map_err(Into::into));
        }
        if let Some(config) = self.config.clone() {
            record("config", config.uninstall().map_err(Into::into));
        }

        self.deregister_host();
        self.deregister_config();
        self.store.uninstall();
        self.installed = false;
        info!("pipeline uninstalled");

        first_error.map_or(Ok(()), Err)
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Validate `host` and make it the registered host.
    ///
    /// A host that fails validation leaves the current host in place.
    pub fn register_host(&mut self, host: Arc<dyn Host>) -> PipelineResult<()> {
        validate_host(host.as_ref())?;
        info!(host = host.name(), "registered host");
        self.host = host;
        Ok(())
    }

    pub fn registered_host(&self) -> Arc<dyn Host> {
        self.host.clone()
    }

    /// Fall back to [`DefaultHost`].
    pub fn deregister_host(&mut self) {
        self.host = Arc::new(DefaultHost);
    }

    /// Validate `config` and make it the registered config.
    pub fn register_config(&mut self, config: Arc<dyn Config>) -> PipelineResult<()> {
        validate_config(config.as_ref())?;
        info!(config = config.name(), "registered config");
        self.config = Some(config);
        Ok(())
    }

    pub fn registered_config(&self) -> Option<Arc<dyn Config>> {
        self.config.clone()
    }

    pub fn deregister_config(&mut self) {
        self.config = None;
    }

    /// Make `provider` the source of the config named `name`.
    pub fn register_config_provider<F>(&mut self, name: impl Into<String>, provider: F)
    where
        F: Fn() -> PipelineResult<Arc<dyn Config>> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(config = %name, "registered config provider");
        self.config_providers.insert(name, Arc::new(provider));
    }

    pub fn deregister_config_provider(&mut self, name: &str) -> bool {
        self.config_providers.remove(name).is_some()
    }

    /// Override the root directory of projects.
    pub fn register_root(&mut self, path: impl AsRef<Path>) {
        let root = forward_slashes(&path.as_ref().to_string_lossy());
        debug!(%root, "registered root");
        self.root = Some(root);
    }

    /// The registered root, else the session's `AVALON_PROJECTS`, with
    /// forward slashes.
    pub fn registered_root(&self) -> String {
        match &self.root {
            Some(root) => root.clone(),
            None => forward_slashes(self.session.get(AVALON_PROJECTS).unwrap_or_default()),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn emit(&self, event: &str, args: &Value) {
        let report = self.events.emit(event, args);
        if report.failed > 0 {
            debug!(event, failed = report.failed, "event subscribers failed");
        }
    }
}

impl fmt::Debug for PipelineKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineKernel")
            .field("installed", &self.installed)
            .field("host", &self.host.name())
            .field("config", &self.config.as_ref().map(|c| c.name().to_string()))
            .field("root", &self.registered_root())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Undo the install hooks that ran before a failed install step.
fn rollback(host: &dyn Host, host_hooked: bool, hooks: Option<&dyn ConfigHostHooks>) {
    if let Some(hooks) = hooks {
        if let Err(err) = hooks.uninstall() {
            warn!(error = %err, "config host hooks rollback failed");
        }
    }
    if host_hooked && host.interface().has("uninstall") {
        if let Err(err) = host.uninstall() {
            warn!(host = host.name(), error = %err, "host rollback failed");
        }
    }
}

pub(crate) fn forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}
