use std::path::Path;

use avalon_plugins::MANIFEST_EXTENSION;
use avalon_store::InMemoryDocumentStore;
use avalon_types::CONTAINER_ID;
use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::session::{AVALON_ASSET, AVALON_PROJECT};

/// Kernel-wide settings.
///
/// Every field has a default, so a settings file only lists what it
/// overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    /// Document store address, the `AVALON_MONGO` default.
    pub store_url: String,
    /// Database name, the `AVALON_DB` default.
    pub database: String,
    /// Name shown in user interfaces, the `AVALON_LABEL` default.
    pub label: String,
    /// Store server-selection timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connection attempts before `install` gives up.
    pub connect_retries: u32,
    /// Session keys `install` refuses to run without.
    pub required_session_keys: Vec<String>,
    /// Marker written on publish instances.
    pub instance_id: String,
    /// Marker written on containers.
    pub container_id: String,
    /// Extension of plug-in manifest files.
    pub manifest_extension: String,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            store_url: "mongodb://localhost:27017".into(),
            database: "avalon".into(),
            label: "Avalon".into(),
            timeout_ms: 1000,
            connect_retries: 3,
            required_session_keys: vec![AVALON_PROJECT.into(), AVALON_ASSET.into()],
            instance_id: avalon_plugins::INSTANCE_ID.into(),
            container_id: CONTAINER_ID.into(),
            manifest_extension: MANIFEST_EXTENSION.into(),
        }
    }
}

impl KernelSettings {
    pub fn from_toml_str(text: &str) -> PipelineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> PipelineResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// An in-memory store honouring `connect_retries`.
    pub fn memory_store(&self) -> InMemoryDocumentStore {
        InMemoryDocumentStore::new().with_max_attempts(self.connect_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn defaults() {
        let s = KernelSettings::default();
        assert_eq!(s.store_url, "mongodb://localhost:27017");
        assert_eq!(s.database, "avalon");
        assert_eq!(s.timeout_ms, 1000);
        assert_eq!(s.connect_retries, 3);
        assert_eq!(s.required_session_keys, vec!["AVALON_PROJECT", "AVALON_ASSET"]);
        assert_eq!(s.instance_id, "pyblish.avalon.instance");
        assert_eq!(s.container_id, "pyblish.avalon.container");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let s = KernelSettings::from_toml_str(
            r#"
            label = "Gotham"
            required_session_keys = ["AVALON_PROJECT", "AVALON_ASSET", "AVALON_TASK"]
            "#,
        )
        .unwrap();
        assert_eq!(s.label, "Gotham");
        assert_eq!(s.required_session_keys.len(), 3);
        assert_eq!(s.database, "avalon");
    }

    #[test]
    fn toml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avalon.toml");
        let mut settings = KernelSettings::default();
        settings.connect_retries = 5;
        std::fs::write(&path, settings.to_toml_string().unwrap()).unwrap();
        assert_eq!(KernelSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn malformed_settings_are_rejected() {
        let err = KernelSettings::from_toml_str("timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, PipelineError::Settings(_)));
    }

    #[test]
    fn memory_store_uses_retry_count() {
        use avalon_store::DocumentStore;

        let mut settings = KernelSettings::default();
        settings.connect_retries = 2;
        let store = settings.memory_store();
        assert!(store.install().is_ok());
        assert_eq!(store.connect_attempts(), 1);
    }
}
