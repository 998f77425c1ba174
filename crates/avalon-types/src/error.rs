use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid document id: {0}")]
    InvalidId(String),

    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("template references unavailable key: {key}")]
    MissingTemplateKey { key: String },

    #[error("malformed template {template:?}: {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Convenience alias for type operations.
pub type Result<T> = std::result::Result<T, TypeError>;
