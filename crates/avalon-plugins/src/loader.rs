//! The resolved context a loader works on.

use avalon_store::RepresentationContext;
use avalon_types::{format_template, TemplateData};

use crate::error::{PluginError, PluginResult};

/// Identifier of a node created in the host scene.
pub type NodeHandle = String;

/// A representation context plus the file path computed for it.
///
/// The path comes from the project's publish template, formatted with the
/// context names, the registered root and the asset's silo.
#[derive(Clone, Debug, PartialEq)]
pub struct LoaderContext {
    pub context: RepresentationContext,
    pub fname: String,
}

impl LoaderContext {
    /// Resolve the file path of `context` under `root`.
    ///
    /// `extra` supplies additional template keys (session values such as
    /// `task` or `app`); keys derived from the context take precedence.
    pub fn new(context: RepresentationContext, root: &str, extra: &TemplateData) -> PluginResult<Self> {
        let mut data = context.template_data(root);
        for (key, value) in extra {
            data.entry(key.clone()).or_insert_with(|| value.clone());
        }
        let template = &context.project.config.template.publish;
        let fname = format_template(template, &data).map_err(|source| PluginError::Template {
            representation: context.representation.id.to_string(),
            source,
        })?;
        Ok(Self { context, fname })
    }

    pub fn subset_name(&self) -> &str {
        &self.context.subset.name
    }

    pub fn asset_name(&self) -> &str {
        &self.context.asset.name
    }
}
