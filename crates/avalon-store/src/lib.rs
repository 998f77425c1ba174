//! Document storage for the Avalon pipeline kernel.
//!
//! The kernel consumes a document database but does not own it. This crate
//! defines the narrow contract the kernel needs ([`DocumentStore`]), a
//! `HashMap`-backed implementation for tests and embedding
//! ([`InMemoryDocumentStore`]), and the hierarchy queries built on top of
//! the contract.
//!
//! # Collections
//!
//! Each project lives in its own collection holding exactly one project
//! document plus its assets, subsets, versions and representations.
//! [`DocumentStore::activate_project`] selects the collection that `find`
//! and `insert_one` operate on.
//!
//! # Lifecycle
//!
//! ```text
//! install() → activate_project(name) → find / insert_one → uninstall()
//! ```
//!
//! Any operation issued outside `install()`/`uninstall()` fails with
//! [`StoreError::NotInstalled`].
//!
//! # Queries
//!
//! - [`parenthood`] -- walk `parent` ids upwards with cycle detection
//! - [`locate`] -- resolve a `[project, asset, subset, version, representation]` path
//! - [`representation_context`] -- every document above a representation
//! - [`latest_version`], [`find_version`], [`find_representation`]

pub mod constraints;
pub mod error;
pub mod filter;
pub mod memory;
pub mod queries;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use filter::{Filter, FindOptions, SortOrder};
pub use memory::InMemoryDocumentStore;
pub use queries::{
    active_project, children, find_document, find_representation, find_version, latest_version,
    locate, parenthood, representation_context, RepresentationContext, VersionSelector,
};
pub use traits::DocumentStore;
