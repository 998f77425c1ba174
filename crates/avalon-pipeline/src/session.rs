//! The pipeline session: string variables describing the current work
//! context.

use std::collections::BTreeMap;

use avalon_plugins::SessionView;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::environment::Environment;
use crate::error::{PipelineError, PipelineResult};
use crate::settings::KernelSettings;

pub const AVALON_PROJECTS: &str = "AVALON_PROJECTS";
pub const AVALON_PROJECT: &str = "AVALON_PROJECT";
pub const AVALON_ASSET: &str = "AVALON_ASSET";
pub const AVALON_SILO: &str = "AVALON_SILO";
pub const AVALON_TASK: &str = "AVALON_TASK";
pub const AVALON_APP: &str = "AVALON_APP";
pub const AVALON_WORKDIR: &str = "AVALON_WORKDIR";
pub const AVALON_SCENEDIR: &str = "AVALON_SCENEDIR";
pub const AVALON_HIERARCHY: &str = "AVALON_HIERARCHY";
pub const AVALON_CONFIG: &str = "AVALON_CONFIG";
pub const AVALON_LABEL: &str = "AVALON_LABEL";
pub const AVALON_TIMEOUT: &str = "AVALON_TIMEOUT";
pub const AVALON_MONGO: &str = "AVALON_MONGO";
pub const AVALON_DB: &str = "AVALON_DB";
pub const AVALON_USER: &str = "AVALON_USER";
pub const AVALON_INSTANCE_ID: &str = "AVALON_INSTANCE_ID";
pub const AVALON_CONTAINER_ID: &str = "AVALON_CONTAINER_ID";

/// Placeholder config name meaning "none configured".
pub const NO_CONFIG: &str = "no_config";

/// Schema tag of a session.
pub const SESSION_SCHEMA: &str = "avalon-core:session-2.0";

/// Keys describing the work context. Always present, empty when unset.
pub const CONTEXT_KEYS: &[&str] = &[
    AVALON_PROJECTS,
    AVALON_PROJECT,
    AVALON_ASSET,
    AVALON_SILO,
    AVALON_TASK,
    AVALON_APP,
    AVALON_WORKDIR,
    AVALON_SCENEDIR,
];

/// Changes to apply to a session, key to new value.
pub type SessionChanges = BTreeMap<String, String>;

/// Process-wide pipeline variables.
///
/// Values are always strings; an empty value means unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    values: BTreeMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session from `env`.
    ///
    /// Context keys are always present. Connection keys fall back to
    /// `settings`. Every other `AVALON_*` variable is carried over as is.
    pub fn from_environment(env: &Environment, settings: &KernelSettings) -> Self {
        let mut values = BTreeMap::new();
        for key in CONTEXT_KEYS {
            values.insert(key.to_string(), env.get(key).unwrap_or_default().to_string());
        }

        let defaults = [
            (AVALON_CONFIG, NO_CONFIG.to_string()),
            (AVALON_LABEL, settings.label.clone()),
            (AVALON_TIMEOUT, settings.timeout_ms.to_string()),
            (AVALON_MONGO, settings.store_url.clone()),
            (AVALON_DB, settings.database.clone()),
            (AVALON_INSTANCE_ID, settings.instance_id.clone()),
            (AVALON_CONTAINER_ID, settings.container_id.clone()),
        ];
        for (key, default) in defaults {
            let value = env
                .get(key)
                .filter(|v| !v.is_empty())
                .map_or(default, str::to_string);
            values.insert(key.to_string(), value);
        }

        for (key, value) in env.iter().filter(|(k, _)| k.starts_with("AVALON_")) {
            values
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }

        values.insert("schema".into(), SESSION_SCHEMA.into());
        Self { values }
    }

    /// Build a session from JSON values, rejecting anything but strings.
    pub fn from_values(values: &Map<String, Value>) -> PipelineResult<Self> {
        values
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key.clone(), s.clone())),
                _ => Err(PipelineError::SessionValueNotString { key: key.clone() }),
            })
            .collect::<PipelineResult<BTreeMap<_, _>>>()
            .map(|values| Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The value of `key` if it is set and not empty.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Apply `changes` over the current values.
    pub fn apply(&mut self, changes: &SessionChanges) {
        for (key, value) in changes {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Which of `keys` are unset or empty, in the order given.
    pub fn missing<S: AsRef<str>>(&self, keys: &[S]) -> Vec<String> {
        keys.iter()
            .map(|key| key.as_ref())
            .filter(|key| self.value(key).is_none())
            .map(str::to_string)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A read-only copy for plug-ins.
    pub fn view(&self) -> SessionView {
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn context_keys_default_to_empty() {
        let session = Session::from_environment(&Environment::new(), &KernelSettings::default());
        for key in CONTEXT_KEYS {
            assert_eq!(session.get(key), Some(""));
        }
        assert_eq!(session.get(AVALON_CONFIG), Some(NO_CONFIG));
        assert_eq!(session.get(AVALON_LABEL), Some("Avalon"));
        assert_eq!(session.get(AVALON_TIMEOUT), Some("1000"));
        assert_eq!(session.get(AVALON_MONGO), Some("mongodb://localhost:27017"));
        assert_eq!(session.get(AVALON_DB), Some("avalon"));
        assert_eq!(session.get(AVALON_CONTAINER_ID), Some("pyblish.avalon.container"));
        assert_eq!(session.get("schema"), Some(SESSION_SCHEMA));
    }

    #[test]
    fn environment_overrides_defaults_and_extras_carry_over() {
        let env = Environment::new()
            .with(AVALON_PROJECT, "batman")
            .with(AVALON_DB, "gotham")
            .with("AVALON_DEADLINE", "http://farm")
            .with("HOME", "/home/bruce");
        let session = Session::from_environment(&env, &KernelSettings::default());
        assert_eq!(session.get(AVALON_PROJECT), Some("batman"));
        assert_eq!(session.get(AVALON_DB), Some("gotham"));
        assert_eq!(session.get("AVALON_DEADLINE"), Some("http://farm"));
        assert_eq!(session.get("HOME"), None);
    }

    #[test]
    fn missing_lists_every_unset_key() {
        let env = Environment::new().with(AVALON_ASSET, "bruce");
        let session = Session::from_environment(&env, &KernelSettings::default());
        assert_eq!(
            session.missing(&[AVALON_PROJECT, AVALON_ASSET, AVALON_TASK]),
            vec![AVALON_PROJECT, AVALON_TASK]
        );
    }

    #[test]
    fn typed_values_are_rejected() {
        let values = json!({"AVALON_PROJECT": "batman", "AVALON_TIMEOUT": 1000});
        let err = Session::from_values(values.as_object().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SessionValueNotString { ref key } if key == "AVALON_TIMEOUT"
        ));
    }

    #[test]
    fn apply_overwrites() {
        let mut session = Session::new();
        session.set(AVALON_TASK, "model");
        let changes = SessionChanges::from([(AVALON_TASK.to_string(), "rig".to_string())]);
        session.apply(&changes);
        assert_eq!(session.value(AVALON_TASK), Some("rig"));
    }

    proptest! {
        #[test]
        fn string_maps_always_build(values in proptest::collection::btree_map("[A-Z_]{1,12}", ".{0,12}", 0..8)) {
            let map: Map<String, Value> = values
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            let session = Session::from_values(&map).unwrap();
            for (key, value) in &values {
                prop_assert_eq!(session.get(key), Some(value.as_str()));
            }
        }

        #[test]
        fn any_number_is_rejected(key in "[A-Z_]{1,12}", n in any::<i64>()) {
            let mut map = Map::new();
            map.insert(key, Value::from(n));
            prop_assert!(Session::from_values(&map).is_err());
        }
    }
}
