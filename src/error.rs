//! Error types shared by the store adapters, the rating engine and the
//! taxonomy manager.

use thiserror::Error;

/// Failure reported by a [`crate::store::RatingStore`] call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Transport failure, timeout or server-side outage.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A label with this name already exists.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// The referenced object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store understood the request and refused it.
    #[error("rejected by store: {0}")]
    Rejected(String),

    /// The store answered with something we could not decode.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Failure of a taxonomy `ensure` / `remove` call as a whole.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("tag not found: {0}")]
    TagNotFound(String),

    #[error("duplicate tag name could not be resolved: {0}")]
    DuplicateName(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("store error on {name}: {source}")]
    Store {
        name: String,
        #[source]
        source: StoreError,
    },
}

impl TaxonomyError {
    /// Lift a store failure seen while working on `name`.
    pub fn from_store(name: &str, err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => TaxonomyError::StoreUnavailable(msg),
            StoreError::DuplicateName(_) => TaxonomyError::DuplicateName(name.to_string()),
            StoreError::NotFound(_) => TaxonomyError::TagNotFound(name.to_string()),
            other => TaxonomyError::Store {
                name: name.to_string(),
                source: other,
            },
        }
    }
}

/// Writing a computed rating back to a record failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to update rating of record {record_id}: {source}")]
pub struct UpdateError {
    pub record_id: String,
    #[source]
    pub source: StoreError,
}
