//! Hierarchy queries over any [`DocumentStore`].

use std::collections::HashSet;
use std::fmt;

use avalon_types::{
    Asset, Document, DocumentId, DocumentKind, Project, Representation, Subset, TemplateData,
    Version,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, FindOptions, SortOrder};
use crate::traits::DocumentStore;

/// Which version of a subset to resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VersionSelector {
    #[default]
    Latest,
    Exact(u32),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact(n) => write!(f, "v{n:03}"),
        }
    }
}

/// Every document from a representation up to its project.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RepresentationContext {
    pub project: Project,
    pub asset: Asset,
    pub subset: Subset,
    pub version: Version,
    pub representation: Representation,
}

impl RepresentationContext {
    /// The silo an asset lives in for path templates.
    ///
    /// Legacy assets carry a silo; hierarchical assets use their ancestor
    /// names joined with `/`.
    pub fn silo(&self) -> String {
        self.asset
            .silo
            .clone()
            .unwrap_or_else(|| self.asset.parents().join("/"))
    }

    /// Values for the project publish template.
    pub fn template_data(&self, root: &str) -> TemplateData {
        let mut data = TemplateData::new();
        data.insert("root".into(), root.to_string());
        data.insert("project".into(), self.project.name.clone());
        data.insert("silo".into(), self.silo());
        data.insert("hierarchy".into(), self.asset.parents().join("/"));
        data.insert("asset".into(), self.asset.name.clone());
        data.insert("subset".into(), self.subset.name.clone());
        data.insert("version".into(), self.version.name.to_string());
        data.insert("representation".into(), self.representation.name.clone());
        if let Some(family) = self.version.data.families.first() {
            data.insert("family".into(), family.clone());
        }
        data
    }

    /// The context as JSON, for event payloads.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Find a single typed document.
pub fn find_document<S>(store: &S, filter: &Filter) -> StoreResult<Option<Document>>
where
    S: DocumentStore + ?Sized,
{
    store
        .find_one(filter, &FindOptions::new())?
        .map(Document::from_value)
        .transpose()
        .map_err(StoreError::from)
}

/// Documents of `kind` directly under `parent`, sorted by name.
pub fn children<S>(store: &S, kind: DocumentKind, parent: Option<DocumentId>) -> StoreResult<Vec<Document>>
where
    S: DocumentStore + ?Sized,
{
    store
        .find(
            &Filter::kind(kind).eq("parent", parent),
            &FindOptions::new().sort_by("name", SortOrder::Ascending),
        )?
        .into_iter()
        .map(|value| Document::from_value(value).map_err(StoreError::from))
        .collect()
}

/// The project document of the active collection.
pub fn active_project<S>(store: &S) -> StoreResult<Option<Project>>
where
    S: DocumentStore + ?Sized,
{
    Ok(find_document(store, &Filter::kind(DocumentKind::Project))?.and_then(Document::into_project))
}

/// Walk `parent` ids upwards from `doc`, nearest parent first.
///
/// The walk stops at a document without a parent or at a dangling parent
/// id. Revisiting a document fails with [`StoreError::CycleDetected`].
pub fn parenthood<S>(store: &S, doc: &Document) -> StoreResult<Vec<Document>>
where
    S: DocumentStore + ?Sized,
{
    let mut visited = HashSet::from([doc.id()]);
    let mut parents = Vec::new();
    let mut next = doc.parent();

    while let Some(parent_id) = next {
        if !visited.insert(parent_id) {
            return Err(StoreError::CycleDetected(parent_id));
        }
        let Some(parent) = find_document(store, &Filter::by_id(parent_id))? else {
            debug!(%parent_id, "parent chain ends at a missing document");
            break;
        };
        next = parent.parent();
        parents.push(parent);
    }

    Ok(parents)
}

/// Resolve `[project, asset, subset, version, representation]` names to the
/// id of the deepest document named.
///
/// The path may stop early. A version component of `latest` or `-1`
/// resolves the highest version. Returns `None` when any component does
/// not resolve.
pub fn locate<S>(store: &S, path: &[&str]) -> StoreResult<Option<DocumentId>>
where
    S: DocumentStore + ?Sized,
{
    let mut parent: Option<DocumentId> = None;

    for (kind, name) in DocumentKind::HIERARCHY.iter().zip(path) {
        let filter = Filter::kind(*kind).eq("parent", parent);
        let mut options = FindOptions::new().project(["_id"]);

        let filter = match kind {
            DocumentKind::Version if matches!(*name, "latest" | "-1") => {
                options = options.sort_by("name", SortOrder::Descending);
                filter
            }
            DocumentKind::Version => match name.parse::<u32>() {
                Ok(number) => filter.eq("name", number),
                Err(_) => return Ok(None),
            },
            _ => filter.eq("name", *name),
        };

        let Some(found) = store.find_one(&filter, &options)? else {
            return Ok(None);
        };
        let id = found
            .get("_id")
            .and_then(Value::as_str)
            .map(DocumentId::parse)
            .transpose()?;
        match id {
            Some(id) => parent = Some(id),
            None => return Ok(None),
        }
    }

    Ok(parent)
}

/// The highest-numbered version of `subset`.
pub fn latest_version<S>(store: &S, subset: DocumentId) -> StoreResult<Option<Version>>
where
    S: DocumentStore + ?Sized,
{
    let found = store.find_one(
        &Filter::kind(DocumentKind::Version).eq("parent", subset),
        &FindOptions::new().sort_by("name", SortOrder::Descending),
    )?;
    Ok(found
        .map(Document::from_value)
        .transpose()?
        .and_then(Document::into_version))
}

/// Version `selector` of `subset`.
pub fn find_version<S>(store: &S, subset: DocumentId, selector: VersionSelector) -> StoreResult<Option<Version>>
where
    S: DocumentStore + ?Sized,
{
    match selector {
        VersionSelector::Latest => latest_version(store, subset),
        VersionSelector::Exact(number) => Ok(find_document(
            store,
            &Filter::kind(DocumentKind::Version)
                .eq("parent", subset)
                .eq("name", number),
        )?
        .and_then(Document::into_version)),
    }
}

/// The representation of `version` named `name`.
pub fn find_representation<S>(store: &S, version: DocumentId, name: &str) -> StoreResult<Option<Representation>>
where
    S: DocumentStore + ?Sized,
{
    Ok(find_document(
        store,
        &Filter::kind(DocumentKind::Representation)
            .eq("parent", version)
            .eq("name", name),
    )?
    .and_then(Document::into_representation))
}

/// Resolve the full context of representation `id`.
pub fn representation_context<S>(store: &S, id: DocumentId) -> StoreResult<RepresentationContext>
where
    S: DocumentStore + ?Sized,
{
    let doc = find_document(store, &Filter::by_id(id))?;
    let Some(Document::Representation(representation)) = doc else {
        return Err(StoreError::NotFound {
            kind: "representation",
            what: id.to_string(),
        });
    };

    let mut version = None;
    let mut subset = None;
    let mut asset = None;
    let mut project = None;
    for parent in parenthood(store, &Document::Representation(representation.clone()))? {
        match parent {
            Document::Version(d) if version.is_none() => version = Some(d),
            Document::Subset(d) if subset.is_none() => subset = Some(d),
            Document::Asset(d) if asset.is_none() => asset = Some(d),
            Document::Project(d) => project = Some(d),
            _ => {}
        }
    }

    let missing = |kind: &'static str| StoreError::NotFound {
        kind,
        what: format!("{kind} above representation {id}"),
    };
    Ok(RepresentationContext {
        version: version.ok_or_else(|| missing("version"))?,
        subset: subset.ok_or_else(|| missing("subset"))?,
        asset: asset.ok_or_else(|| missing("asset"))?,
        project: project.ok_or_else(|| missing("project"))?,
        representation,
    })
}
