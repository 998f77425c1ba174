use avalon_host::HostError;
use avalon_plugins::PluginError;
use avalon_store::StoreError;
use avalon_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required session keys are unset. Lists every one of them.
    #[error("{} missing from environment", .0.join(", "))]
    MissingSessionKeys(Vec<String>),

    #[error("no pipeline config registered under {0:?}")]
    ConfigNotFound(String),

    #[error("loader {loader:?} is incompatible with {subset:?}")]
    IncompatibleLoader { loader: String, subset: String },

    /// The loader a container names was not discovered.
    #[error("no loader named {0:?} was discovered")]
    LoaderNotFound(String),

    #[error("loader {0:?} does not support switch")]
    SwitchUnsupported(String),

    #[error("no creator plug-in ran for family {0:?}")]
    NoCreator(String),

    #[error("{kind} not found: {what}")]
    NotFound { kind: &'static str, what: String },

    #[error("session value {key:?} is not a string")]
    SessionValueNotString { key: String },

    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("settings encoding failed: {0}")]
    SettingsEncode(#[from] toml::ser::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("plug-in error: {0}")]
    Plugin(#[from] PluginError),

    #[error("invalid value: {0}")]
    Type(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
