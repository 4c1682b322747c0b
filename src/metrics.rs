use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

pub const RECORDS_PROCESSED: &str = "rating_records_processed_total";
pub const RECORDS_UPDATED: &str = "rating_records_updated_total";
pub const RECORDS_SKIPPED: &str = "rating_records_skipped_total";
pub const UPDATE_FAILURES: &str = "rating_update_failures_total";
pub const LABELS_CREATED: &str = "taxonomy_labels_created_total";
pub const LABELS_DESTROYED: &str = "taxonomy_labels_destroyed_total";

/// One-time registration so the series carry descriptions once a recorder is installed.
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(RECORDS_PROCESSED, "Scenes run through the rating engine.");
        describe_counter!(RECORDS_UPDATED, "Scenes whose stored rating was changed.");
        describe_counter!(
            RECORDS_SKIPPED,
            "Scenes skipped for carrying too few rating categories."
        );
        describe_counter!(UPDATE_FAILURES, "Rating write-backs refused or lost.");
        describe_counter!(LABELS_CREATED, "Rating tags created by taxonomy sync.");
        describe_counter!(LABELS_DESTROYED, "Rating tags destroyed by taxonomy removal.");
    });
}

pub fn incr(name: &'static str) {
    counter!(name).increment(1);
}
