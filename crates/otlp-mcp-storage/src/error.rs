//! Error kinds surfaced at the storage boundary (§7).

use thiserror::Error;

/// Errors the storage layer can return to its callers (the MCP tool surface
/// and, indirectly, the ingress).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A caller-supplied value failed validation (empty snapshot name,
    /// malformed attribute filter, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A named resource (snapshot, service) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// `create_snapshot` was called with a name already in use.
    #[error("duplicate snapshot name: {0}")]
    DuplicateName(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
