//! Storage ports for enrichment plus in-memory implementations.

use std::collections::{BTreeMap, HashMap};

use lineage_types::{DirectorySnapshot, StaffMapping, StaffRecord};
use uuid::Uuid;

use super::merger::FieldUpdate;
use crate::error::StoreError;

/// Read/write access to staff records.
pub trait EntityStore {
    fn mappings(&self) -> Result<Vec<StaffMapping>, StoreError>;

    /// `Ok(None)` when the record does not exist.
    fn load(&self, entity_id: Uuid) -> Result<Option<StaffRecord>, StoreError>;

    /// Persist the fields present in `update`; untouched fields stay as they are.
    fn apply(&mut self, update: &FieldUpdate) -> Result<(), StoreError>;
}

/// Batch lookup of directory snapshots by external id.
pub trait SnapshotSource {
    fn snapshots(
        &self,
        external_ids: &[String],
    ) -> Result<HashMap<String, DirectorySnapshot>, StoreError>;
}

impl SnapshotSource for HashMap<String, DirectorySnapshot> {
    fn snapshots(
        &self,
        external_ids: &[String],
    ) -> Result<HashMap<String, DirectorySnapshot>, StoreError> {
        Ok(external_ids
            .iter()
            .filter_map(|id| self.get(id).map(|snap| (id.clone(), snap.clone())))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    records: BTreeMap<Uuid, StaffRecord>,
    mappings: Vec<StaffMapping>,
    mappings_error: Option<String>,
    unreadable: Vec<Uuid>,
    rejecting: Vec<Uuid>,
    writes: usize,
}

impl InMemoryEntityStore {
    pub fn new(records: impl IntoIterator<Item = StaffRecord>, mappings: Vec<StaffMapping>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
            mappings,
            ..Self::default()
        }
    }

    /// Fail `mappings()` as if the store were unreachable.
    pub fn with_mappings_error(mut self, reason: impl Into<String>) -> Self {
        self.mappings_error = Some(reason.into());
        self
    }

    /// Fail `load()` for this record.
    pub fn with_unreadable(mut self, entity_id: Uuid) -> Self {
        self.unreadable.push(entity_id);
        self
    }

    /// Fail `apply()` for this record.
    pub fn with_rejected_writes(mut self, entity_id: Uuid) -> Self {
        self.rejecting.push(entity_id);
        self
    }

    pub fn record(&self, entity_id: Uuid) -> Option<&StaffRecord> {
        self.records.get(&entity_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &StaffRecord> {
        self.records.values()
    }

    /// Number of successful `apply()` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl EntityStore for InMemoryEntityStore {
    fn mappings(&self) -> Result<Vec<StaffMapping>, StoreError> {
        match &self.mappings_error {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(self.mappings.clone()),
        }
    }

    fn load(&self, entity_id: Uuid) -> Result<Option<StaffRecord>, StoreError> {
        if self.unreadable.contains(&entity_id) {
            return Err(StoreError::Unavailable(format!("cannot read {entity_id}")));
        }
        Ok(self.records.get(&entity_id).cloned())
    }

    fn apply(&mut self, update: &FieldUpdate) -> Result<(), StoreError> {
        if self.rejecting.contains(&update.entity_id) {
            return Err(StoreError::WriteRejected {
                entity_id: update.entity_id.to_string(),
                reason: "constraint violation".to_string(),
            });
        }
        let record = self
            .records
            .get_mut(&update.entity_id)
            .ok_or_else(|| StoreError::NotFound(update.entity_id.to_string()))?;
        update.apply_to(record);
        self.writes += 1;
        Ok(())
    }
}
