//! Data-model invariants enforced on insert.
//!
//! - Names pass [`Document::validate`]
//! - Ids are unique within the collection
//! - One project document per collection
//! - Every non-project document has a stored parent
//! - Asset names are unique within their silo or visual-parent scope
//! - Subset and representation names are unique per parent
//! - Version numbers strictly increase per subset

use avalon_types::{Document, DocumentKind};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

fn stored(collection: &[Value]) -> impl Iterator<Item = Document> + '_ {
    collection
        .iter()
        .filter_map(|value| Document::from_value(value.clone()).ok())
}

/// Check that `doc` may be added to `collection`.
pub fn check_insert(collection: &[Value], doc: &Document) -> StoreResult<()> {
    doc.validate()?;

    let id = doc.id();
    if stored(collection).any(|existing| existing.id() == id) {
        return Err(StoreError::DuplicateId(id));
    }

    if let Document::Project(project) = doc {
        if let Some(existing) = stored(collection).find(|d| d.kind() == DocumentKind::Project) {
            return Err(StoreError::DuplicateName {
                kind: "project",
                name: project.name.clone(),
                scope: format!("collection already holding project {:?}", existing.name()),
            });
        }
        return Ok(());
    }

    let parent = doc.parent().ok_or_else(|| StoreError::NotFound {
        kind: "parent",
        what: format!("{} {:?} has no parent", doc.kind(), doc.name()),
    })?;
    if !stored(collection).any(|existing| existing.id() == parent) {
        return Err(StoreError::ParentNotFound {
            kind: doc.kind().as_str(),
            name: doc.name(),
            parent,
        });
    }

    match doc {
        Document::Asset(asset) => {
            let scope = asset.scope_key();
            let clash = stored(collection)
                .filter_map(Document::into_asset)
                .any(|other| other.name == asset.name && other.scope_key() == scope);
            if clash {
                return Err(StoreError::DuplicateName {
                    kind: "asset",
                    name: asset.name.clone(),
                    scope,
                });
            }
        }
        Document::Version(version) => {
            let latest = stored(collection)
                .filter_map(Document::into_version)
                .filter(|other| other.parent == version.parent)
                .map(|other| other.name)
                .max();
            if let Some(latest) = latest {
                if version.name <= latest {
                    return Err(StoreError::VersionNotIncreasing {
                        subset: parent,
                        latest,
                        attempted: version.name,
                    });
                }
            }
        }
        Document::Subset(_) | Document::Representation(_) => {
            let kind = doc.kind();
            let name = doc.name();
            let clash = stored(collection).any(|other| {
                other.kind() == kind && other.parent() == Some(parent) && other.name() == name
            });
            if clash {
                return Err(StoreError::DuplicateName {
                    kind: kind.as_str(),
                    name,
                    scope: format!("parent {parent}"),
                });
            }
        }
        Document::Project(_) => {}
    }

    Ok(())
}
