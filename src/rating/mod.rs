//! # Rating Engine
//! Turns the rating tags on a scene into a stored rating.
//!
//! Per record: parse labels → compute rating → write it back only when it
//! differs from what is stored. Batches isolate failures per record.

pub mod scoring;

pub use scoring::{compute_rating, parse_label, parse_scores, ParsedScores, ScoreMap};

use crate::config::RatingConfig;
use crate::error::{StoreError, UpdateError};
use crate::metrics;
use crate::store::{RatingStore, Record, RecordFilter};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What `apply_rating` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Updated { from: Option<i64>, to: i64 },
    Unchanged,
}

/// Result of processing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Updated { from: Option<i64>, to: i64 },
    Unchanged,
    /// Too few scored categories.
    Skipped { scored: usize, required: usize },
    Failed(UpdateError),
}

/// Tally of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Ids of records whose update failed.
    pub failed_ids: Vec<String>,
}

impl BatchReport {
    fn record(&mut self, id: &str, outcome: &RecordOutcome) {
        self.processed += 1;
        match outcome {
            RecordOutcome::Updated { .. } => self.updated += 1,
            RecordOutcome::Unchanged => self.unchanged += 1,
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::Failed(_) => {
                self.failed += 1;
                self.failed_ids.push(id.to_string());
            }
        }
    }
}

/// Write `new_rating` unless the record already holds it (absent counts as 0).
pub async fn apply_rating(
    store: &dyn RatingStore,
    record: &Record,
    new_rating: i64,
) -> Result<ApplyOutcome, UpdateError> {
    if record.current_rating() == new_rating {
        return Ok(ApplyOutcome::Unchanged);
    }
    store
        .update_record_rating(&record.id, new_rating)
        .await
        .map_err(|source| UpdateError {
            record_id: record.id.clone(),
            source,
        })?;
    Ok(ApplyOutcome::Updated {
        from: record.rating,
        to: new_rating,
    })
}

pub async fn process_one(
    store: &dyn RatingStore,
    record: &Record,
    cfg: &RatingConfig,
) -> RecordOutcome {
    metrics::ensure_described();
    metrics::incr(metrics::RECORDS_PROCESSED);

    let parsed = parse_scores(record.labels.as_slice(), &cfg.categories);
    if !parsed.ambiguous.is_empty() {
        warn!(
            scene = %record.id,
            categories = ?parsed.ambiguous,
            "conflicting rating tags; ignoring those categories"
        );
    }
    debug!(scene = %record.id, scores = ?parsed.scores, "parsed rating tags");

    let Some(rating) = compute_rating(
        &parsed.scores,
        &cfg.categories,
        cfg.minimum_required_tags,
        cfg.rating_scale,
    ) else {
        info!(
            scene = %record.id,
            title = record.display_title(),
            scored = parsed.len(),
            required = cfg.minimum_required_tags,
            "rating skipped"
        );
        metrics::incr(metrics::RECORDS_SKIPPED);
        return RecordOutcome::Skipped {
            scored: parsed.len(),
            required: cfg.minimum_required_tags,
        };
    };

    match apply_rating(store, record, rating).await {
        Ok(ApplyOutcome::Updated { from, to }) => {
            info!(scene = %record.id, title = record.display_title(), ?from, to, "rating updated");
            metrics::incr(metrics::RECORDS_UPDATED);
            RecordOutcome::Updated { from, to }
        }
        Ok(ApplyOutcome::Unchanged) => {
            debug!(scene = %record.id, rating, "rating unchanged");
            RecordOutcome::Unchanged
        }
        Err(e) => {
            warn!(error = %e, scene = %record.id, "rating update failed");
            metrics::incr(metrics::UPDATE_FAILURES);
            RecordOutcome::Failed(e)
        }
    }
}

/// Process every record; one failure never stops the rest.
pub async fn process_batch(
    store: &dyn RatingStore,
    records: &[Record],
    cfg: &RatingConfig,
) -> BatchReport {
    let mut report = BatchReport::default();
    for record in records {
        let outcome = process_one(store, record, cfg).await;
        report.record(&record.id, &outcome);
    }
    info!(
        processed = report.processed,
        updated = report.updated,
        unchanged = report.unchanged,
        skipped = report.skipped,
        failed = report.failed,
        "rating batch finished"
    );
    report
}

/// Fetch the records selected by `filter`, then run [`process_batch`].
pub async fn process_filter(
    store: &dyn RatingStore,
    filter: &RecordFilter,
    cfg: &RatingConfig,
) -> Result<BatchReport, StoreError> {
    let records = store.find_records(filter).await?;
    info!(count = records.len(), ?filter, store = store.name(), "processing scenes");
    Ok(process_batch(store, &records, cfg).await)
}
