use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use avalon_types::{Document, DocumentId, DocumentKind};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::constraints::check_insert;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, FindOptions};
use crate::traits::DocumentStore;

/// Default number of connection attempts made by `install`.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;

const MEMORY_URL: &str = "memory://avalon";

#[derive(Debug, Default)]
struct State {
    installed: bool,
    active: Option<String>,
    collections: BTreeMap<String, Vec<Value>>,
    connect_attempts: u32,
}

/// In-memory document store.
///
/// Intended for tests and embedding. Collections are held behind a
/// `RwLock`; documents are cloned on read and write. Collections survive
/// `uninstall`, mirroring a database that outlives the connection.
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
    unreachable: Option<String>,
    max_attempts: u32,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            unreachable: None,
            max_attempts: DEFAULT_CONNECT_ATTEMPTS,
        }
    }

    /// A store whose `install` always fails with `reason`.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            unreachable: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Set how many connection attempts `install` makes before failing.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Total connection attempts made so far.
    pub fn connect_attempts(&self) -> u32 {
        self.read().map(|state| state.connect_attempts).unwrap_or(0)
    }

    /// Names of every collection.
    pub fn collection_names(&self) -> Vec<String> {
        self.read()
            .map(|state| state.collections.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of documents in the active collection.
    pub fn len(&self) -> usize {
        self.read()
            .ok()
            .and_then(|state| {
                let name = state.active.as_ref()?;
                state.collections.get(name).map(Vec::len)
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert typed documents into the active collection, in order.
    pub fn insert_all<I>(&self, docs: I) -> StoreResult<Vec<DocumentId>>
    where
        I: IntoIterator<Item = Document>,
    {
        docs.into_iter()
            .map(|doc| self.insert_one(doc.to_value()?))
            .collect()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    fn installed_state(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        let state = self.read()?;
        if !state.installed {
            return Err(StoreError::NotInstalled);
        }
        Ok(state)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn install(&self) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.installed {
            return Ok(());
        }
        if let Some(reason) = &self.unreachable {
            for attempt in 1..=self.max_attempts {
                state.connect_attempts += 1;
                warn!(url = MEMORY_URL, attempt, reason = %reason, "document store connection failed");
            }
            return Err(StoreError::Connection {
                url: MEMORY_URL.into(),
                attempts: self.max_attempts,
                reason: reason.clone(),
            });
        }
        state.connect_attempts += 1;
        state.installed = true;
        info!(url = MEMORY_URL, "document store connected");
        Ok(())
    }

    fn uninstall(&self) {
        if let Ok(mut state) = self.write() {
            if state.installed {
                debug!(url = MEMORY_URL, "document store disconnected");
            }
            state.installed = false;
            state.active = None;
        }
    }

    fn is_installed(&self) -> bool {
        self.read().map(|state| state.installed).unwrap_or(false)
    }

    fn activate_project(&self, name: &str) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.installed {
            return Err(StoreError::NotInstalled);
        }
        state.collections.entry(name.to_string()).or_default();
        state.active = Some(name.to_string());
        debug!(project = name, "activated project collection");
        Ok(())
    }

    fn active_project(&self) -> Option<String> {
        self.read().ok().and_then(|state| state.active.clone())
    }

    fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<Value>> {
        let state = self.installed_state()?;
        let name = state.active.as_ref().ok_or(StoreError::NoActiveProject)?;
        let matches = state
            .collections
            .get(name)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(options.apply(matches))
    }

    fn insert_one(&self, mut doc: Value) -> StoreResult<DocumentId> {
        let mut state = self.write()?;
        if !state.installed {
            return Err(StoreError::NotInstalled);
        }
        let name = state.active.clone().ok_or(StoreError::NoActiveProject)?;

        let Value::Object(fields) = &mut doc else {
            return Err(StoreError::InvalidDocument(
                avalon_types::TypeError::InvalidDocument("document must be a JSON object".into()),
            ));
        };
        let id = match fields.get("_id").and_then(Value::as_str) {
            Some(raw) => DocumentId::parse(raw)?,
            None => {
                let id = DocumentId::new();
                fields.insert("_id".into(), id.into());
                id
            }
        };

        let known_kind = fields
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| DocumentKind::HIERARCHY.iter().any(|k| k.as_str() == kind));

        let collection = state.collections.entry(name.clone()).or_default();
        if known_kind {
            let typed = Document::from_value(doc.clone())?;
            check_insert(collection, &typed)?;
        } else {
            let raw_id = id.to_string();
            if collection
                .iter()
                .any(|existing| existing.get("_id").and_then(Value::as_str) == Some(raw_id.as_str()))
            {
                return Err(StoreError::DuplicateId(id));
            }
        }

        collection.push(doc);
        debug!(project = %name, %id, "inserted document");
        Ok(id)
    }

    fn projects(&self) -> StoreResult<Vec<Value>> {
        let state = self.installed_state()?;
        let filter = Filter::kind(DocumentKind::Project);
        Ok(state
            .collections
            .values()
            .flat_map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned())
            .collect())
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("installed", &self.is_installed())
            .field("active", &self.active_project())
            .field("collections", &self.collection_names())
            .finish()
    }
}
