//! # Rating tag taxonomy
//!
//! Keeps the tag tree that rating labels live in:
//!
//! ```text
//! Advanced Rating System
//! ├── acting
//! │   ├── acting_1 … acting_5
//! ├── camera
//! │   ├── camera_1 … camera_5
//! …
//! ```
//!
//! Every node is resolved with find-before-create (and find-before-destroy
//! on removal), so repeated runs converge instead of duplicating tags. This
//! assumes nobody else edits the same tags while a run is in progress.

use crate::error::{StoreError, TaxonomyError};
use crate::metrics;
use crate::store::{Label, NewLabel, RatingStore};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const ROOT_NAME: &str = "Advanced Rating System";
pub const ROOT_DESCRIPTION: &str = "Advanced Rating System: Parent tag for all rating categories";
const ROOT_IMAGE: &str = concat!(
    "data:image/svg+xml;base64,",
    "PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHZpZXdCb3g9IjAgMCAyNCAy",
    "NCIgZmlsbD0ibm9uZSI+PHBhdGggZD0iTTUuNjM2IDUuNjM2TDE4LjM2NCAxOC4zNjRNNS42MzYg",
    "MTguMzY0TDE4LjM2NCA1LjYzNk0yMSAxMkMyMSAxNi45NzEgMTYuOTcxIDIxIDEyIDIxQzcuMDI5",
    "IDIxIDMgMTYuOTcxIDMgMTJDMyA3LjAyOSA3LjAyOSAzIDEyIDNDMTYuOTcxIDMgMjEgNy4wMjkg",
    "MjEgMTJaIiBzdHJva2U9IiNmZmZmZmYiIHN0cm9rZS13aWR0aD0iMS41IiBzdHJva2UtbGluZWNh",
    "cD0icm91bmQiLz48L3N2Zz4=",
);

/// Create payload for the root tag.
pub fn root_label() -> NewLabel {
    NewLabel {
        name: ROOT_NAME.to_string(),
        description: Some(ROOT_DESCRIPTION.to_string()),
        image: Some(ROOT_IMAGE.to_string()),
    }
}

/// `acting`, 3 → `acting_3`.
pub fn leaf_name(category: &str, level: u8) -> String {
    format!("{category}_{level}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub label: Label,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnsureReport {
    pub created: Vec<String>,
    pub existing: usize,
    /// Nodes that could not be resolved; their subtrees were skipped.
    pub failed: Vec<String>,
}

impl EnsureReport {
    fn note(&mut self, r: &Resolved) {
        match r.resolution {
            Resolution::Created => self.created.push(r.label.name.clone()),
            Resolution::Found => self.existing += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoveReport {
    pub destroyed: Vec<String>,
    /// Nodes that were already gone.
    pub absent: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoveOutcome {
    Declined { reason: String },
    Removed(RemoveReport),
}

pub struct TaxonomyManager<'a> {
    store: &'a dyn RatingStore,
}

impl<'a> TaxonomyManager<'a> {
    pub fn new(store: &'a dyn RatingStore) -> Self {
        Self { store }
    }

    /// Find `spec.name`; create it when missing and, for new nodes only,
    /// attach `parent_id` in a second call. A lost create race is resolved
    /// by looking the name up again.
    pub async fn find_or_create(
        &self,
        spec: &NewLabel,
        parent_id: Option<&str>,
    ) -> Result<Resolved, StoreError> {
        if let Some(label) = self.store.find_label_by_name(&spec.name).await? {
            debug!(tag = %label.name, id = %label.id, "tag found");
            return Ok(Resolved {
                label,
                resolution: Resolution::Found,
            });
        }

        let mut label = match self.store.create_label(spec).await {
            Ok(l) => l,
            Err(StoreError::DuplicateName(msg)) => {
                debug!(tag = %spec.name, "tag appeared concurrently; looking it up again");
                return match self.store.find_label_by_name(&spec.name).await? {
                    Some(label) => Ok(Resolved {
                        label,
                        resolution: Resolution::Found,
                    }),
                    None => Err(StoreError::DuplicateName(msg)),
                };
            }
            Err(e) => return Err(e),
        };
        info!(tag = %label.name, id = %label.id, "tag created");
        metrics::incr(metrics::LABELS_CREATED);

        if let Some(pid) = parent_id {
            match self.store.set_label_parent(&label.id, pid).await {
                Ok(()) => label.parent_ids = vec![pid.to_string()],
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => warn!(error = %e, tag = %label.name, parent = pid, "could not attach parent"),
            }
        }

        Ok(Resolved {
            label,
            resolution: Resolution::Created,
        })
    }

    /// Make sure root, categories and `levels` numbered leaves per category
    /// exist. Safe to call repeatedly.
    pub async fn ensure(
        &self,
        categories: &[String],
        levels: u8,
    ) -> Result<EnsureReport, TaxonomyError> {
        metrics::ensure_described();
        info!(categories = categories.len(), levels, "ensuring rating tags");

        let mut report = EnsureReport::default();
        let root = self
            .find_or_create(&root_label(), None)
            .await
            .map_err(|e| TaxonomyError::from_store(ROOT_NAME, e))?;
        report.note(&root);

        for cat in categories {
            let cat_node = match self
                .find_or_create(&NewLabel::named(cat.as_str()), Some(root.label.id.as_str()))
                .await
            {
                Ok(r) => r,
                Err(e) if e.is_unavailable() => return Err(TaxonomyError::from_store(cat, e)),
                Err(e) => {
                    warn!(error = %e, category = %cat, "skipping category");
                    report.failed.push(cat.clone());
                    continue;
                }
            };
            report.note(&cat_node);

            for level in 1..=levels {
                let name = leaf_name(cat, level);
                match self
                    .find_or_create(&NewLabel::named(name.as_str()), Some(cat_node.label.id.as_str()))
                    .await
                {
                    Ok(r) => report.note(&r),
                    Err(e) if e.is_unavailable() => {
                        return Err(TaxonomyError::from_store(&name, e))
                    }
                    Err(e) => {
                        warn!(error = %e, tag = %name, "skipping rating tag");
                        report.failed.push(name);
                    }
                }
            }
        }

        info!(
            created = report.created.len(),
            existing = report.existing,
            failed = report.failed.len(),
            "rating tags ensured"
        );
        Ok(report)
    }

    /// Destroy root, categories and their numbered leaves. Declines unless
    /// `allow_destructive` is set.
    pub async fn remove(
        &self,
        categories: &[String],
        levels: u8,
        allow_destructive: bool,
    ) -> Result<RemoveOutcome, TaxonomyError> {
        if !allow_destructive {
            let reason =
                "tag removal is disabled; enable allow_destructive_actions to remove rating tags"
                    .to_string();
            info!("{reason}");
            return Ok(RemoveOutcome::Declined { reason });
        }
        metrics::ensure_described();

        let mut names = vec![ROOT_NAME.to_string()];
        for cat in categories {
            names.push(cat.clone());
            names.extend((1..=levels).map(|l| leaf_name(cat, l)));
        }

        let mut report = RemoveReport::default();
        for name in names {
            match self.destroy_named(&name).await {
                Ok(true) => report.destroyed.push(name),
                Ok(false) => report.absent += 1,
                Err(e) if e.is_unavailable() => return Err(TaxonomyError::from_store(&name, e)),
                Err(e) => {
                    warn!(error = %e, tag = %name, "could not remove tag");
                    report.failed.push(name);
                }
            }
        }

        info!(
            destroyed = report.destroyed.len(),
            absent = report.absent,
            failed = report.failed.len(),
            "rating tags removed"
        );
        Ok(RemoveOutcome::Removed(report))
    }

    /// `Ok(false)` when there was nothing to destroy.
    async fn destroy_named(&self, name: &str) -> Result<bool, StoreError> {
        let Some(label) = self.store.find_label_by_name(name).await? else {
            debug!(tag = name, "tag absent; nothing to remove");
            return Ok(false);
        };
        match self.store.destroy_label(&label.id).await {
            Ok(()) => {
                info!(tag = %label.name, id = %label.id, "tag removed");
                metrics::incr(metrics::LABELS_DESTROYED);
                Ok(true)
            }
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn leaf_names() {
        assert_eq!(leaf_name("acting", 1), "acting_1");
        assert_eq!(leaf_name("video_quality", 5), "video_quality_5");
    }

    #[test]
    fn root_label_carries_description_and_icon() {
        let r = root_label();
        assert_eq!(r.name, ROOT_NAME);
        assert_eq!(r.description.as_deref(), Some(ROOT_DESCRIPTION));
        assert!(r.image.unwrap().starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn find_or_create_finds_before_creating() {
        let store = MemoryStore::new();
        store.insert_label("acting", None);
        let tm = TaxonomyManager::new(&store);
        let r = tm
            .find_or_create(&NewLabel::named("Acting"), None)
            .await
            .unwrap();
        assert_eq!(r.resolution, Resolution::Found);
        assert_eq!(store.calls().creates, 0);
    }

    #[tokio::test]
    async fn lost_race_resolves_to_existing_tag() {
        let store = MemoryStore::new();
        let root = store.insert_label(ROOT_NAME, None);
        store.race_create_of("story");
        let tm = TaxonomyManager::new(&store);
        let r = tm
            .find_or_create(&NewLabel::named("story"), Some(root.as_str()))
            .await
            .unwrap();
        assert_eq!(r.resolution, Resolution::Found);
        // parent is only attached to nodes we created ourselves
        assert_eq!(store.calls().set_parents, 0);
    }

    #[tokio::test]
    async fn parent_failure_keeps_the_new_node() {
        let store = MemoryStore::new();
        let root = store.insert_label(ROOT_NAME, None);
        store.fail_set_parent_for("camera");
        let tm = TaxonomyManager::new(&store);
        let r = tm
            .find_or_create(&NewLabel::named("camera"), Some(root.as_str()))
            .await
            .unwrap();
        assert_eq!(r.resolution, Resolution::Created);
        assert!(r.label.parent_ids.is_empty());
    }
}
