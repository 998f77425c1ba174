use avalon_types::{DocumentId, TypeError};

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store was used before `install()` or after `uninstall()`.
    #[error("document store is not installed")]
    NotInstalled,

    /// A collection operation was issued before `activate_project()`.
    #[error("no active project; call activate_project() first")]
    NoActiveProject,

    /// The backend could not be reached.
    #[error("could not connect to {url} after {attempts} attempt(s): {reason}")]
    Connection {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// A document referenced by id or name does not exist.
    #[error("{kind} not found: {what}")]
    NotFound { kind: &'static str, what: String },

    /// A document with the same id is already stored.
    #[error("duplicate document id: {0}")]
    DuplicateId(DocumentId),

    /// A sibling with the same name already exists in the naming scope.
    #[error("{kind} named {name:?} already exists in {scope}")]
    DuplicateName {
        kind: &'static str,
        name: String,
        scope: String,
    },

    /// A document's `parent` does not resolve to a stored document.
    #[error("parent {parent} of {kind} {name:?} does not exist")]
    ParentNotFound {
        kind: &'static str,
        name: String,
        parent: DocumentId,
    },

    /// Version numbers must strictly increase per subset.
    #[error("version {attempted} of subset {subset} is not greater than latest version {latest}")]
    VersionNotIncreasing {
        subset: DocumentId,
        latest: u32,
        attempted: u32,
    },

    /// Walking `parent` ids revisited a document.
    #[error("parent chain contains a cycle at {0}")]
    CycleDetected(DocumentId),

    /// The document failed data-model validation.
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] TypeError),

    /// A lock guarding in-memory state was poisoned by a panicking thread.
    #[error("store state lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
