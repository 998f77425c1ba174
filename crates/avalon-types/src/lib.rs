//! Foundation types for the Avalon pipeline kernel.
//!
//! This crate provides the document data model shared by the store, the
//! plug-in registry, host adapters and the pipeline kernel. Every other
//! Avalon crate depends on `avalon-types`.
//!
//! # Hierarchy
//!
//! Documents form a tree that is walked upwards through `parent` ids:
//!
//! ```text
//! Project → Asset → Subset → Version → Representation
//! ```
//!
//! A [`Container`] is not a document. It is the host-scene record created
//! when a representation is loaded, and lives as long as the scene file.
//!
//! # Key Types
//!
//! - [`DocumentId`]: Time-ordered document identifier (UUID v7)
//! - [`Document`]: Tagged union of every stored document kind
//! - [`Project`], [`Asset`], [`Subset`], [`Version`], [`Representation`]
//! - [`Container`]: In-scene record of a loaded representation
//! - [`format_template`]: Path template formatting (`{asset}`, `{version:0>3}`)

pub mod container;
pub mod document;
pub mod error;
pub mod id;
pub mod names;
pub mod template;

pub use container::{Container, CONTAINER_ID, CONTAINER_SCHEMA};
pub use document::{
    AppDef, Asset, Document, DocumentKind, Project, ProjectConfig, Representation, Subset,
    TaskDef, Templates, Version, VersionData, ASSET_SCHEMA, DEFAULT_PUBLISH_TEMPLATE,
    DEFAULT_WORK_TEMPLATE, SUBSET_SCHEMA,
};
pub use error::{Result, TypeError};
pub use id::DocumentId;
pub use names::{validate_asset_name, validate_identifier, validate_subset_name};
pub use template::{format_template, TemplateData, MAX_FIELD_WIDTH};
