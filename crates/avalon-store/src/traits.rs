use avalon_types::DocumentId;
use serde_json::Value;

use crate::error::StoreResult;
use crate::filter::{Filter, FindOptions};

/// The document database as seen by the pipeline kernel.
///
/// All implementations must satisfy these invariants:
/// - Every operation other than `install` fails with
///   [`StoreError::NotInstalled`](crate::StoreError::NotInstalled) while the
///   store is not installed.
/// - `find`, `find_one` and `insert_one` operate on the collection selected
///   by `activate_project` and fail with
///   [`StoreError::NoActiveProject`](crate::StoreError::NoActiveProject)
///   before one is selected.
/// - Connection failures surface from `install`; any retrying happens
///   inside the implementation.
/// - Stored documents are never mutated by reads.
pub trait DocumentStore: Send + Sync {
    /// Connect to the backend.
    fn install(&self) -> StoreResult<()>;

    /// Close the connection. Idempotent.
    fn uninstall(&self);

    fn is_installed(&self) -> bool;

    /// Select the collection holding project `name`.
    fn activate_project(&self, name: &str) -> StoreResult<()>;

    /// Name of the active collection, if any.
    fn active_project(&self) -> Option<String>;

    /// Every document in the active collection matching `filter`.
    fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<Value>>;

    /// The first document matching `filter` after sorting.
    fn find_one(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Option<Value>> {
        let options = FindOptions {
            limit: Some(1),
            ..options.clone()
        };
        Ok(self.find(filter, &options)?.into_iter().next())
    }

    /// Insert a document into the active collection, returning its id.
    ///
    /// A missing `_id` is assigned. Documents of a known `type` are
    /// validated against the data-model invariants before insertion.
    fn insert_one(&self, doc: Value) -> StoreResult<DocumentId>;

    /// The project documents of every collection.
    fn projects(&self) -> StoreResult<Vec<Value>>;
}
