// src/lib.rs
// Public library surface for the plugin binary and integration tests.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod plugin;
pub mod rating;
pub mod store;
pub mod taxonomy;

// ---- Re-exports for stable public API ----
pub use crate::config::{RatingConfig, RatingScale};
pub use crate::error::{StoreError, TaxonomyError, UpdateError};
pub use crate::rating::{
    apply_rating, compute_rating, parse_scores, process_batch, process_filter, process_one,
    BatchReport, RecordOutcome,
};
pub use crate::store::{MemoryStore, RatingStore, Record, RecordFilter};
pub use crate::taxonomy::{EnsureReport, RemoveOutcome, TaxonomyManager};
