//! Error types for the workspace services

use pagecraft_editor::{EditorError, MutationError, SchemaError};
use thiserror::Error;

/// Failure of a single template fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Invalid template reference: {0:?}")]
    InvalidRef(String),

    #[error("Fetch failed for {template_ref}: {message}")]
    Failed {
        template_ref: String,
        message: String,
    },
}

/// Template load failure, shared by every waiter of a coalesced fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to load template '{template_ref}': {cause}")]
pub struct LoadError {
    pub template_ref: String,
    #[source]
    pub cause: FetchError,
}

#[derive(Error, Debug)]
pub enum DeserializeError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Draft or page store failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid draft JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote store error: {0}")]
    Remote(String),
}

#[derive(Error, Debug)]
pub enum AutosaveError {
    #[error("Final save failed: {0}")]
    SaveFailed(#[source] StoreError),

    #[error("Nothing to save")]
    NothingToSave,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    #[error(transparent)]
    Autosave(#[from] AutosaveError),
}
