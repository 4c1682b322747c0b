// src/store/mod.rs
//! Remote store abstraction: scenes with their tags, and tag definitions.
//!
//! The rating engine and the taxonomy manager only talk to the store through
//! [`RatingStore`], so the Stash GraphQL client and the in-memory test store
//! are interchangeable.

pub mod memory;
pub mod stash;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use stash::{ServerConnection, StashClient};

/// A rated media entity (a Stash scene).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Stored rating, `None` when the record was never rated.
    #[serde(default)]
    pub rating: Option<i64>,
    /// Names of the labels attached to the record.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Record {
    /// Current rating with "absent" read as 0.
    pub fn current_rating(&self) -> i64 {
        self.rating.unwrap_or(0)
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("<untitled>")
    }
}

/// A label (tag) definition as known by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_ids: Vec<String>,
}

/// Payload for creating a label. Parents are attached in a separate call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NewLabel {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon as a data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NewLabel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Which records a batch run looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    All,
    /// Records without any stored rating.
    Unrated,
    ById(String),
}

#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    async fn find_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError>;

    /// Exact, case-insensitive lookup by name.
    async fn find_label_by_name(&self, name: &str) -> Result<Option<Label>, StoreError>;

    async fn create_label(&self, label: &NewLabel) -> Result<Label, StoreError>;

    async fn set_label_parent(&self, label_id: &str, parent_id: &str) -> Result<(), StoreError>;

    async fn destroy_label(&self, label_id: &str) -> Result<(), StoreError>;

    async fn update_record_rating(&self, record_id: &str, rating: i64) -> Result<(), StoreError>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}
