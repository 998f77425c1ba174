//! Plug-in manifest files.
//!
//! A manifest is a TOML file listing the plug-ins a directory provides.
//! Each entry names the role it fills and the implementation that builds
//! it; implementations are registered in code with
//! [`PluginRegistry::register_factory`](crate::PluginRegistry::register_factory).
//!
//! ```toml
//! [[plugin]]
//! name = "ModelLoader"
//! role = "Loader"
//! implementation = "maya.reference"
//! label = "Reference model"
//! families = ["model"]
//! representations = ["ma", "abc"]
//!
//! [[plugin]]
//! name = "ModelCreator"
//! role = "Creator"
//! implementation = "maya.instance"
//! family = "model"
//! defaults = ["Main", "Proxy"]
//! ```

use std::fs;
use std::path::Path;

use avalon_types::validate_identifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PluginError, PluginResult};
use crate::role::PluginRole;

/// One `[[plugin]]` entry of a manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    pub role: PluginRole,
    /// Key of the factory that builds the plug-in.
    pub implementation: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub families: Vec<String>,
    #[serde(default)]
    pub representations: Vec<String>,
    /// Family of a creator.
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Suggested subset names of a creator.
    #[serde(default)]
    pub defaults: Vec<String>,
    /// Free-form settings passed through to the factory.
    #[serde(default)]
    pub options: Value,
}

impl PluginSpec {
    /// A minimal entry, mostly useful in tests.
    pub fn new(name: impl Into<String>, role: PluginRole, implementation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            implementation: implementation.into(),
            label: None,
            order: 0,
            families: Vec::new(),
            representations: Vec::new(),
            family: None,
            icon: None,
            color: None,
            defaults: Vec::new(),
            options: Value::Null,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    plugin: Vec<PluginSpec>,
}

/// Parse manifest text. `path` is only used in error messages.
pub fn parse_manifest(text: &str, path: &Path) -> PluginResult<Vec<PluginSpec>> {
    let file: ManifestFile = toml::from_str(text).map_err(|e| PluginError::Manifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    for spec in &file.plugin {
        validate_identifier(&spec.name)?;
    }
    Ok(file.plugin)
}

/// Read and parse the manifest at `path`.
pub fn load_manifest(path: &Path) -> PluginResult<Vec<PluginSpec>> {
    let text = fs::read_to_string(path)?;
    parse_manifest(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_field() {
        let text = r#"
            [[plugin]]
            name = "ModelLoader"
            role = "Loader"
            implementation = "test.loader"
            label = "Reference model"
            order = -1
            families = ["model"]
            representations = ["ma", "abc"]
            icon = "file"
            color = "orange"

            [plugin.options]
            reference = true

            [[plugin]]
            name = "ModelCreator"
            role = "Creator"
            implementation = "test.creator"
            family = "model"
            defaults = ["Main"]
        "#;
        let specs = parse_manifest(text, Path::new("plugins.toml")).unwrap();
        assert_eq!(specs.len(), 2);

        let loader = &specs[0];
        assert_eq!(loader.role, PluginRole::Loader);
        assert_eq!(loader.order, -1);
        assert_eq!(loader.representations, vec!["ma", "abc"]);
        assert_eq!(loader.options["reference"], true);

        let creator = &specs[1];
        assert_eq!(creator.family.as_deref(), Some("model"));
        assert_eq!(creator.defaults, vec!["Main"]);
        assert!(creator.options.is_null());
    }

    #[test]
    fn unknown_role_fails_the_whole_manifest() {
        let text = r#"
            [[plugin]]
            name = "Good"
            role = "Loader"
            implementation = "x"

            [[plugin]]
            name = "Bad"
            role = "Publisher"
            implementation = "x"
        "#;
        let err = parse_manifest(text, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, PluginError::Manifest { .. }));
    }

    #[test]
    fn names_must_be_identifiers() {
        let text = r#"
            [[plugin]]
            name = "Model Loader"
            role = "Loader"
            implementation = "x"
        "#;
        let err = parse_manifest(text, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, PluginError::InvalidName(_)));
    }

    #[test]
    fn empty_manifest_has_no_plugins() {
        assert!(parse_manifest("", Path::new("empty.toml")).unwrap().is_empty());
    }
}
