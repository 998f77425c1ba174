//! Creator payloads.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PluginError, PluginResult};

/// Default marker identifying a host node as a publish instance.
pub const INSTANCE_ID: &str = "pyblish.avalon.instance";

/// The instance a creator hands to the host.
///
/// `data` always starts from the fixed payload `id`, `family`, `asset`,
/// `subset` and `active`, with caller data merged over it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreatorInstance {
    pub name: String,
    pub asset: String,
    pub family: String,
    pub options: Value,
    pub data: Map<String, Value>,
}

impl CreatorInstance {
    pub fn new(
        instance_id: &str,
        family: &str,
        name: &str,
        asset: &str,
        options: Value,
        data: Map<String, Value>,
    ) -> Self {
        let mut merged = Map::new();
        merged.insert("id".into(), Value::String(instance_id.into()));
        merged.insert("family".into(), Value::String(family.into()));
        merged.insert("asset".into(), Value::String(asset.into()));
        merged.insert("subset".into(), Value::String(name.into()));
        merged.insert("active".into(), Value::Bool(true));
        merged.extend(data);

        Self {
            name: name.to_string(),
            asset: asset.to_string(),
            family: family.to_string(),
            options,
            data: merged,
        }
    }

    /// The subset the instance publishes to.
    pub fn subset(&self) -> &str {
        self.data
            .get("subset")
            .and_then(Value::as_str)
            .unwrap_or(&self.name)
    }

    pub fn is_active(&self) -> bool {
        self.data
            .get("active")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

/// Fail with [`PluginError::NameCollision`] if `name` is already taken.
pub fn check_collision<'a, I>(existing: I, name: &str) -> PluginResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    if existing.into_iter().any(|taken| taken == name) {
        return Err(PluginError::NameCollision {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_payload_is_merged_under_caller_data() {
        let mut data = Map::new();
        data.insert("active".into(), json!(false));
        data.insert("frameStart".into(), json!(1001));
        let instance =
            CreatorInstance::new(INSTANCE_ID, "model", "modelDefault", "bruce", Value::Null, data);

        assert_eq!(instance.data["id"], INSTANCE_ID);
        assert_eq!(instance.data["family"], "model");
        assert_eq!(instance.data["asset"], "bruce");
        assert_eq!(instance.subset(), "modelDefault");
        assert_eq!(instance.data["frameStart"], 1001);
        assert!(!instance.is_active());
    }

    #[test]
    fn collisions_are_errors() {
        assert!(check_collision(["modelDefault"], "rigDefault").is_ok());
        let err = check_collision(["modelDefault"], "modelDefault").unwrap_err();
        assert!(matches!(err, PluginError::NameCollision { name } if name == "modelDefault"));
    }
}
