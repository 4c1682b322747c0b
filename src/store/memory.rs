// src/store/memory.rs
//! In-memory [`RatingStore`] with call counters and failure injection.
//! Used by the test suite and handy for dry runs against fixture data.

use super::{Label, NewLabel, RatingStore, Record, RecordFilter};
use crate::error::StoreError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// How many times each mutating operation was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub creates: usize,
    pub set_parents: usize,
    pub destroys: usize,
    pub updates: usize,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    labels: Vec<Label>,
    records: Vec<Record>,
    calls: CallCounts,
    unavailable: bool,
    failing_updates: HashSet<String>,
    failing_creates: HashMap<String, StoreError>,
    failing_parents: HashSet<String>,
    // Names that "another process" creates right before our create call lands.
    racing_creates: HashSet<String>,
}

impl State {
    fn alloc_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn find_label(&self, name: &str) -> Option<&Label> {
        self.labels
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name.trim()))
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("memory store switched off".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        let store = Self::new();
        store.lock().records = records;
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().expect("memory store mutex poisoned")
    }

    pub fn insert_record(&self, record: Record) {
        self.lock().records.push(record);
    }

    /// Pre-seed a label; returns its id.
    pub fn insert_label(&self, name: &str, parent_id: Option<&str>) -> String {
        let mut st = self.lock();
        let id = st.alloc_id();
        st.labels.push(Label {
            id: id.clone(),
            name: name.to_string(),
            parent_ids: parent_id.map(|p| vec![p.to_string()]).unwrap_or_default(),
        });
        id
    }

    pub fn labels(&self) -> Vec<Label> {
        self.lock().labels.clone()
    }

    pub fn label(&self, name: &str) -> Option<Label> {
        self.lock().find_label(name).cloned()
    }

    pub fn record(&self, id: &str) -> Option<Record> {
        self.lock().records.iter().find(|r| r.id == id).cloned()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn reset_calls(&self) {
        self.lock().calls = CallCounts::default();
    }

    pub fn set_unavailable(&self, down: bool) {
        self.lock().unavailable = down;
    }

    pub fn fail_update_for(&self, record_id: &str) {
        self.lock().failing_updates.insert(record_id.to_string());
    }

    pub fn fail_create_for(&self, name: &str, err: StoreError) {
        self.lock().failing_creates.insert(name.to_string(), err);
    }

    pub fn fail_set_parent_for(&self, label_name: &str) {
        self.lock().failing_parents.insert(label_name.to_string());
    }

    /// Simulate a concurrent writer creating `name` between our find and create.
    pub fn race_create_of(&self, name: &str) {
        self.lock().racing_creates.insert(name.to_string());
    }
}

#[async_trait::async_trait]
impl RatingStore for MemoryStore {
    async fn find_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        let st = self.lock();
        st.check_available()?;
        let out = st
            .records
            .iter()
            .filter(|r| match filter {
                RecordFilter::All => true,
                RecordFilter::Unrated => r.rating.is_none(),
                RecordFilter::ById(id) => &r.id == id,
            })
            .cloned()
            .collect();
        Ok(out)
    }

    async fn find_label_by_name(&self, name: &str) -> Result<Option<Label>, StoreError> {
        let st = self.lock();
        st.check_available()?;
        Ok(st.find_label(name).cloned())
    }

    async fn create_label(&self, label: &NewLabel) -> Result<Label, StoreError> {
        let mut st = self.lock();
        st.check_available()?;
        st.calls.creates += 1;

        if let Some(err) = st.failing_creates.get(&label.name) {
            return Err(err.clone());
        }
        if st.racing_creates.remove(&label.name) {
            let id = st.alloc_id();
            st.labels.push(Label {
                id,
                name: label.name.clone(),
                parent_ids: Vec::new(),
            });
        }
        if st.find_label(&label.name).is_some() {
            return Err(StoreError::DuplicateName(format!(
                "tag with name '{}' already exists",
                label.name
            )));
        }

        let id = st.alloc_id();
        let created = Label {
            id,
            name: label.name.clone(),
            parent_ids: Vec::new(),
        };
        st.labels.push(created.clone());
        Ok(created)
    }

    async fn set_label_parent(&self, label_id: &str, parent_id: &str) -> Result<(), StoreError> {
        let mut st = self.lock();
        st.check_available()?;
        st.calls.set_parents += 1;

        if !st.labels.iter().any(|l| l.id == parent_id) {
            return Err(StoreError::NotFound(format!("parent tag {parent_id}")));
        }
        let failing = st.failing_parents.clone();
        let label = st
            .labels
            .iter_mut()
            .find(|l| l.id == label_id)
            .ok_or_else(|| StoreError::NotFound(format!("tag {label_id}")))?;
        if failing.contains(&label.name) {
            return Err(StoreError::Rejected(format!(
                "cannot set parent of {}",
                label.name
            )));
        }
        label.parent_ids = vec![parent_id.to_string()];
        Ok(())
    }

    async fn destroy_label(&self, label_id: &str) -> Result<(), StoreError> {
        let mut st = self.lock();
        st.check_available()?;
        st.calls.destroys += 1;

        let before = st.labels.len();
        st.labels.retain(|l| l.id != label_id);
        if st.labels.len() == before {
            return Err(StoreError::NotFound(format!("tag {label_id}")));
        }
        for l in st.labels.iter_mut() {
            l.parent_ids.retain(|p| p != label_id);
        }
        Ok(())
    }

    async fn update_record_rating(&self, record_id: &str, rating: i64) -> Result<(), StoreError> {
        let mut st = self.lock();
        st.check_available()?;
        st.calls.updates += 1;

        if st.failing_updates.contains(record_id) {
            return Err(StoreError::Rejected(format!(
                "update of scene {record_id} refused"
            )));
        }
        let rec = st
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| StoreError::NotFound(format!("scene {record_id}")))?;
        rec.rating = Some(rating);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_twice_reports_duplicate() {
        let store = MemoryStore::new();
        store.create_label(&NewLabel::named("acting")).await.unwrap();
        let err = store
            .create_label(&NewLabel::named("Acting"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));
        assert_eq!(store.calls().creates, 2);
    }

    #[tokio::test]
    async fn unrated_filter_only_returns_records_without_rating() {
        let store = MemoryStore::with_records(vec![
            Record {
                id: "1".into(),
                rating: Some(40),
                ..Default::default()
            },
            Record {
                id: "2".into(),
                ..Default::default()
            },
        ]);
        let out = store.find_records(&RecordFilter::Unrated).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "2");
    }
}
