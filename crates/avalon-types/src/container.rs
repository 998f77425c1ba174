//! The in-scene record of a loaded representation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::DocumentId;

/// Schema tag written on every container.
pub const CONTAINER_SCHEMA: &str = "avalon-core:container-2.0";

/// Marker identifying a host node as an Avalon container.
pub const CONTAINER_ID: &str = "pyblish.avalon.container";

/// A host-scene record created when a representation is loaded.
///
/// Containers are not store documents: they live in the host scene and are
/// returned by the host's `ls`. The kernel only ever swaps the
/// `representation` they point at (`update`/`switch`) or destroys them
/// (`remove`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub schema: String,
    pub id: String,
    pub name: String,
    pub namespace: String,
    /// Name of the loader plug-in that created the container.
    pub loader: String,
    pub representation: DocumentId,
    /// Host-native node holding the container, if the host has one.
    #[serde(rename = "objectName", default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    /// Host-specific extras.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Container {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        loader: impl Into<String>,
        representation: DocumentId,
    ) -> Self {
        Self {
            schema: CONTAINER_SCHEMA.into(),
            id: CONTAINER_ID.into(),
            name: name.into(),
            namespace: namespace.into(),
            loader: loader.into(),
            representation,
            object_name: None,
            data: Map::new(),
        }
    }

    pub fn with_object_name(mut self, object_name: impl Into<String>) -> Self {
        self.object_name = Some(object_name.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Whether the record carries the container marker.
    pub fn is_container(&self) -> bool {
        self.id == CONTAINER_ID
    }
}
