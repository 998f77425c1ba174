//! Document types for the asset hierarchy.
//!
//! Every stored record is a [`Document`], internally tagged by its `type`
//! field so the JSON shape matches what the document store filters on:
//!
//! ```json
//! { "_id": "...", "type": "version", "name": 3, "parent": "...", "data": { ... } }
//! ```
//!
//! Assets support two hierarchy mechanisms side by side. The legacy `silo`
//! field groups assets into top-level buckets, while `data.visualParent`
//! (plus `data.parents`, the ancestor names) nests assets under other assets.
//! Both are read; [`Asset::new`] and [`Asset::with_visual_parent`] write the
//! `visualParent` form.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TypeError};
use crate::id::DocumentId;
use crate::names::{validate_asset_name, validate_subset_name};

pub const PROJECT_SCHEMA: &str = "avalon-core:project-2.0";
pub const CONFIG_SCHEMA: &str = "avalon-core:config-1.0";
pub const ASSET_SCHEMA: &str = "avalon-core:asset-3.0";
pub const SUBSET_SCHEMA: &str = "avalon-core:subset-3.0";
pub const VERSION_SCHEMA: &str = "avalon-core:version-3.0";
pub const REPRESENTATION_SCHEMA: &str = "avalon-core:representation-2.0";

/// Default work-area template, relative to the registered root.
pub const DEFAULT_WORK_TEMPLATE: &str = "{root}/{project}/{silo}/{asset}/work/{task}/{app}";

/// Default publish template, relative to the registered root.
pub const DEFAULT_PUBLISH_TEMPLATE: &str =
    "{root}/{project}/{silo}/{asset}/publish/{subset}/v{version:0>3}/{subset}.{representation}";

fn project_schema() -> String {
    PROJECT_SCHEMA.into()
}

fn config_schema() -> String {
    CONFIG_SCHEMA.into()
}

fn asset_schema() -> String {
    ASSET_SCHEMA.into()
}

fn subset_schema() -> String {
    SUBSET_SCHEMA.into()
}

fn version_schema() -> String {
    VERSION_SCHEMA.into()
}

fn representation_schema() -> String {
    REPRESENTATION_SCHEMA.into()
}

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

/// The `type` of a stored document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Project,
    Asset,
    Subset,
    Version,
    Representation,
}

impl DocumentKind {
    /// All kinds, top of the hierarchy first.
    pub const HIERARCHY: [DocumentKind; 5] = [
        Self::Project,
        Self::Asset,
        Self::Subset,
        Self::Version,
        Self::Representation,
    ];

    /// The string stored in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Asset => "asset",
            Self::Subset => "subset",
            Self::Version => "version",
            Self::Representation => "representation",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Path templates of a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Templates {
    pub work: String,
    pub publish: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            work: DEFAULT_WORK_TEMPLATE.into(),
            publish: DEFAULT_PUBLISH_TEMPLATE.into(),
        }
    }
}

/// A task type available in a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An application definition available in a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Project-level configuration: pipeline config name, templates, tasks, apps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "config_schema")]
    pub schema: String,
    /// Name of the pipeline config to activate on install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub template: Templates,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
    #[serde(default)]
    pub apps: Vec<AppDef>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let tasks = ["model", "render", "animate", "rig", "lookdev", "layout"]
            .into_iter()
            .map(|name| TaskDef {
                name: name.into(),
                label: None,
            })
            .collect();
        Self {
            schema: config_schema(),
            name: None,
            template: Templates::default(),
            tasks,
            apps: vec![AppDef {
                name: "shell".into(),
                label: Some("Shell".into()),
            }],
        }
    }
}

/// The singleton project document of a store collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(default = "project_schema")]
    pub schema: String,
    #[serde(default)]
    pub parent: Option<DocumentId>,
    #[serde(default)]
    pub config: ProjectConfig,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Project {
    /// Create a project with the default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            schema: project_schema(),
            parent: None,
            config: ProjectConfig::default(),
            data: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// A named unit of creative work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(default = "asset_schema")]
    pub schema: String,
    /// Project id, or for hierarchical assets the id of the parent asset.
    #[serde(default)]
    pub parent: Option<DocumentId>,
    /// Legacy top-level grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silo: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Asset {
    /// Create a top-level asset under `project`.
    ///
    /// New assets always carry `data.visualParent` (null at the top level)
    /// and `data.parents`.
    pub fn new(name: impl Into<String>, project: DocumentId) -> Self {
        let mut data = Map::new();
        data.insert("visualParent".into(), Value::Null);
        data.insert("parents".into(), Value::Array(Vec::new()));
        Self {
            id: DocumentId::new(),
            name: name.into(),
            schema: asset_schema(),
            parent: Some(project),
            silo: None,
            data,
        }
    }

    /// Nest this asset under `visual_parent`, recording the ancestor names.
    pub fn with_visual_parent(mut self, visual_parent: DocumentId, parents: Vec<String>) -> Self {
        self.data
            .insert("visualParent".into(), visual_parent.into());
        self.data.insert(
            "parents".into(),
            Value::Array(parents.into_iter().map(Value::String).collect()),
        );
        self
    }

    /// Place this asset in a legacy silo.
    pub fn with_silo(mut self, silo: impl Into<String>) -> Self {
        self.silo = Some(silo.into());
        self
    }

    /// The asset this one is visually nested under, if any.
    pub fn visual_parent(&self) -> Option<DocumentId> {
        self.data
            .get("visualParent")
            .and_then(Value::as_str)
            .and_then(|s| DocumentId::parse(s).ok())
    }

    /// Names of the ancestors, outermost first.
    pub fn parents(&self) -> Vec<String> {
        self.data
            .get("parents")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The scope within which the asset name must be unique.
    ///
    /// A visual parent wins over a silo; assets with neither are scoped to
    /// their `parent` id.
    pub fn scope_key(&self) -> String {
        if let Some(visual_parent) = self.visual_parent() {
            return format!("visualParent:{visual_parent}");
        }
        if let Some(silo) = &self.silo {
            return format!("silo:{silo}");
        }
        match &self.parent {
            Some(parent) => format!("parent:{parent}"),
            None => "root".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Subset
// ---------------------------------------------------------------------------

/// A deliverable stream of an asset, e.g. `modelDefault`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subset {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(default = "subset_schema")]
    pub schema: String,
    #[serde(default)]
    pub parent: Option<DocumentId>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Subset {
    pub fn new(name: impl Into<String>, asset: DocumentId) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            schema: subset_schema(),
            parent: Some(asset),
            data: Map::new(),
        }
    }

    pub fn with_families(mut self, families: &[&str]) -> Self {
        self.data.insert(
            "families".into(),
            Value::Array(families.iter().map(|f| Value::String((*f).into())).collect()),
        );
        self
    }

    /// Families recorded on the subset (subset schema 3.0 and later).
    pub fn families(&self) -> Vec<String> {
        string_list(self.data.get("families"))
    }
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Publish metadata of a version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub families: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An immutable, numbered publish of a subset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Version number, strictly increasing per subset.
    pub name: u32,
    #[serde(default = "version_schema")]
    pub schema: String,
    #[serde(default)]
    pub parent: Option<DocumentId>,
    #[serde(default)]
    pub data: VersionData,
}

impl Version {
    pub fn new(number: u32, subset: DocumentId) -> Self {
        Self {
            id: DocumentId::new(),
            name: number,
            schema: version_schema(),
            parent: Some(subset),
            data: VersionData::default(),
        }
    }

    pub fn with_families(mut self, families: &[&str]) -> Self {
        self.data.families = families.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.data.author = Some(author.into());
        self.data.time = Some(Utc::now());
        self
    }

    pub fn with_frame_range(mut self, start: i64, end: i64) -> Self {
        self.data.frame_start = Some(start);
        self.data.frame_end = Some(end);
        self
    }
}

// ---------------------------------------------------------------------------
// Representation
// ---------------------------------------------------------------------------

/// One file-format instance of a version, e.g. `ma` or `abc`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Format tag, the extension without a leading dot.
    pub name: String,
    #[serde(default = "representation_schema")]
    pub schema: String,
    #[serde(default)]
    pub parent: Option<DocumentId>,
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Values the `data.template` path template was formatted with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl Representation {
    pub fn new(name: impl Into<String>, version: DocumentId) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            schema: representation_schema(),
            parent: Some(version),
            data: Map::new(),
            context: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.data.insert("path".into(), Value::String(path.into()));
        self
    }

    pub fn with_template(mut self, template: impl Into<String>, context: Map<String, Value>) -> Self {
        self.data
            .insert("template".into(), Value::String(template.into()));
        self.context = Some(context);
        self
    }

    /// Explicit path stored on the representation.
    pub fn path(&self) -> Option<&str> {
        self.data.get("path").and_then(Value::as_str)
    }

    /// Path template stored on the representation.
    pub fn template(&self) -> Option<&str> {
        self.data.get("template").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Any stored document, tagged by its `type` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Document {
    Project(Project),
    Asset(Asset),
    Subset(Subset),
    Version(Version),
    Representation(Representation),
}

macro_rules! document_accessors {
    ($( $variant:ident => $as_fn:ident, $into_fn:ident; )*) => {
        $(
            #[doc = concat!("Borrow as a [`", stringify!($variant), "`] if the kind matches.")]
            pub fn $as_fn(&self) -> Option<&$variant> {
                match self {
                    Self::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            #[doc = concat!("Convert into a [`", stringify!($variant), "`] if the kind matches.")]
            pub fn $into_fn(self) -> Option<$variant> {
                match self {
                    Self::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        )*
    };
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Project(_) => DocumentKind::Project,
            Self::Asset(_) => DocumentKind::Asset,
            Self::Subset(_) => DocumentKind::Subset,
            Self::Version(_) => DocumentKind::Version,
            Self::Representation(_) => DocumentKind::Representation,
        }
    }

    pub fn id(&self) -> DocumentId {
        match self {
            Self::Project(d) => d.id,
            Self::Asset(d) => d.id,
            Self::Subset(d) => d.id,
            Self::Version(d) => d.id,
            Self::Representation(d) => d.id,
        }
    }

    pub fn parent(&self) -> Option<DocumentId> {
        match self {
            Self::Project(d) => d.parent,
            Self::Asset(d) => d.parent,
            Self::Subset(d) => d.parent,
            Self::Version(d) => d.parent,
            Self::Representation(d) => d.parent,
        }
    }

    /// The document name as a string (version numbers are rendered).
    pub fn name(&self) -> String {
        match self {
            Self::Project(d) => d.name.clone(),
            Self::Asset(d) => d.name.clone(),
            Self::Subset(d) => d.name.clone(),
            Self::Version(d) => d.name.to_string(),
            Self::Representation(d) => d.name.clone(),
        }
    }

    document_accessors! {
        Project => as_project, into_project;
        Asset => as_asset, into_asset;
        Subset => as_subset, into_subset;
        Version => as_version, into_version;
        Representation => as_representation, into_representation;
    }

    /// Check the naming invariants of the document.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Project(d) => validate_asset_name(&d.name).map_err(|_| TypeError::InvalidName {
                kind: "project",
                name: d.name.clone(),
                reason: "project names must be non-empty and free of whitespace and separators"
                    .into(),
            }),
            Self::Asset(d) => validate_asset_name(&d.name),
            Self::Subset(d) => validate_subset_name(&d.name),
            Self::Version(d) if d.name == 0 => Err(TypeError::InvalidName {
                kind: "version",
                name: d.name.to_string(),
                reason: "version numbers start at 1".into(),
            }),
            Self::Version(_) => Ok(()),
            Self::Representation(d) if d.name.trim().is_empty() || d.name.starts_with('.') => {
                Err(TypeError::InvalidName {
                    kind: "representation",
                    name: d.name.clone(),
                    reason: "expected an extension tag without a leading dot".into(),
                })
            }
            Self::Representation(_) => Ok(()),
        }
    }

    /// Serialize into the JSON shape held by the document store.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| TypeError::InvalidDocument(e.to_string()))
    }

    /// Parse a document from the JSON shape held by the document store.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| TypeError::InvalidDocument(e.to_string()))
    }
}

macro_rules! impl_from_document {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Document {
                fn from(inner: $variant) -> Self {
                    Self::$variant(inner)
                }
            }
        )*
    };
}

impl_from_document!(Project, Asset, Subset, Version, Representation);

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_is_tagged_by_type() {
        let project = Project::new("batman");
        let value = Document::from(project.clone()).to_value().unwrap();
        assert_eq!(value["type"], "project");
        assert_eq!(value["name"], "batman");
        assert_eq!(value["_id"], json!(project.id.to_string()));
        assert_eq!(value["parent"], Value::Null);
    }

    #[test]
    fn version_parses_from_store_shape() {
        let subset = DocumentId::new();
        let id = DocumentId::new();
        let value = json!({
            "_id": id.to_string(),
            "type": "version",
            "name": 3,
            "parent": subset.to_string(),
            "data": {
                "author": "bruce",
                "families": ["model"],
                "frameStart": 1001,
                "frameEnd": 1100,
                "studioTag": "hero"
            }
        });
        let doc = Document::from_value(value).unwrap();
        let version = doc.into_version().unwrap();
        assert_eq!(version.name, 3);
        assert_eq!(version.parent, Some(subset));
        assert_eq!(version.data.families, vec!["model"]);
        assert_eq!(version.data.frame_start, Some(1001));
        assert_eq!(version.data.extra["studioTag"], "hero");
        assert_eq!(version.schema, VERSION_SCHEMA);
    }

    #[test]
    fn asset_reads_both_hierarchy_mechanisms() {
        let project = DocumentId::new();
        let legacy = Asset::new("bruce", project).with_silo("assets");
        assert_eq!(legacy.scope_key(), "silo:assets");
        assert!(legacy.visual_parent().is_none());

        let parent = Asset::new("characters", project);
        let nested = Asset::new("bruce", project)
            .with_visual_parent(parent.id, vec!["characters".into()]);
        assert_eq!(nested.visual_parent(), Some(parent.id));
        assert_eq!(nested.parents(), vec!["characters"]);
        assert_eq!(nested.scope_key(), format!("visualParent:{}", parent.id));
    }

    #[test]
    fn subset_validation_rejects_spaces() {
        let doc = Document::from(Subset::new("model Default", DocumentId::new()));
        assert!(doc.validate().is_err());
        let doc = Document::from(Subset::new("modelDefault", DocumentId::new()));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn version_zero_is_invalid() {
        let doc = Document::from(Version::new(0, DocumentId::new()));
        assert!(matches!(
            doc.validate(),
            Err(TypeError::InvalidName { kind: "version", .. })
        ));
    }

    #[test]
    fn representation_rejects_dotted_extension() {
        let doc = Document::from(Representation::new(".ma", DocumentId::new()));
        assert!(doc.validate().is_err());
    }

    #[test]
    fn accessors_match_kind() {
        let doc = Document::from(Subset::new("rigDefault", DocumentId::new()).with_families(&["rig"]));
        assert_eq!(doc.kind(), DocumentKind::Subset);
        assert!(doc.as_version().is_none());
        assert_eq!(doc.as_subset().unwrap().families(), vec!["rig"]);
        assert_eq!(doc.name(), "rigDefault");
    }

    #[test]
    fn default_project_config_has_templates() {
        let config = ProjectConfig::default();
        assert_eq!(config.template.publish, DEFAULT_PUBLISH_TEMPLATE);
        assert!(config.tasks.iter().any(|t| t.name == "model"));
        assert!(config.name.is_none());
    }
}
