//! Snapshot → record merge policy.
//!
//! Write rules, each evaluated independently once a record passes the
//! snapshot checks:
//!
//! - `avatar_url`: always evaluated, written only when the record has none
//! - `title`, `phone`: written only when selected and currently blank
//! - `directory_snapshot`: deep-merged into `source_data.<namespace>`, marked
//!   changed only when the serialized result differs
//!
//! Non-blank values are never overwritten.

use lineage_types::{DirectorySnapshot, EnrichableField, StaffRecord};
use serde::Serialize;
use serde_json::{Map, Value};
use strum::Display;
use uuid::Uuid;

use super::merge::{deep_merge, is_blank};
use super::selection::FieldSelection;
use crate::config::EnrichmentConfig;

/// Why a record was not enriched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    NoSnapshot,
    Suspended,
    Deleted,
    RecordUnavailable,
    RecordMissing,
    NothingToWrite,
    WriteFailed,
    DuplicateMapping,
}

/// One accepted write to a scalar field, pending audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub entity_id: Uuid,
    pub field: EnrichableField,
    pub previous: Option<String>,
    pub new: Option<String>,
    pub source_ref: String,
}

/// Minimal set of writes for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub entity_id: Uuid,
    pub avatar_url: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    /// Full replacement `source_data`, present only if it changed.
    pub source_data: Option<Value>,
    /// Lineage entries for `avatar_url`, `title`, `phone`.
    pub changes: Vec<FieldChange>,
}

impl FieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.avatar_url.is_none()
            && self.title.is_none()
            && self.phone.is_none()
            && self.source_data.is_none()
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.avatar_url.is_some() {
            fields.push(EnrichableField::AvatarUrl.as_str());
        }
        if self.title.is_some() {
            fields.push(EnrichableField::Title.as_str());
        }
        if self.phone.is_some() {
            fields.push(EnrichableField::Phone.as_str());
        }
        if self.source_data.is_some() {
            fields.push("source_data");
        }
        fields
    }

    /// Apply to an in-memory copy of the record.
    pub fn apply_to(&self, record: &mut StaffRecord) {
        if let Some(avatar) = &self.avatar_url {
            record.avatar_url = Some(avatar.clone());
        }
        if let Some(title) = &self.title {
            record.title = Some(title.clone());
        }
        if let Some(phone) = &self.phone {
            record.phone = Some(phone.clone());
        }
        if let Some(source_data) = &self.source_data {
            record.source_data = source_data.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentMerger {
    selection: FieldSelection,
    config: EnrichmentConfig,
}

impl EnrichmentMerger {
    pub fn new(selection: FieldSelection, config: EnrichmentConfig) -> Self {
        Self { selection, config }
    }

    pub fn selection(&self) -> &FieldSelection {
        &self.selection
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Stale-data guard. Deleted wins over suspended when both are set.
    pub fn check_snapshot(&self, snapshot: &DirectorySnapshot) -> Result<(), SkipReason> {
        if snapshot.is_deleted {
            return Err(SkipReason::Deleted);
        }
        if snapshot.is_suspended {
            return Err(SkipReason::Suspended);
        }
        Ok(())
    }

    /// Compute the writes `snapshot` implies for `record`.
    ///
    /// Returns `Err(SkipReason)` when the snapshot fails the stale-data guard
    /// or nothing qualifies for writing.
    pub fn merge(
        &self,
        record: &StaffRecord,
        snapshot: &DirectorySnapshot,
    ) -> Result<FieldUpdate, SkipReason> {
        self.check_snapshot(snapshot)?;

        let mut update = FieldUpdate {
            entity_id: record.id,
            ..FieldUpdate::default()
        };

        if let Some(photo) = fill_blank(
            record.avatar_url.as_deref(),
            snapshot.thumbnail_photo_url.as_deref(),
        ) {
            update.changes.push(self.change(
                record,
                EnrichableField::AvatarUrl,
                record.avatar_url.clone(),
                &photo,
            ));
            update.avatar_url = Some(photo);
        }

        if self.selection.contains(EnrichableField::Title) {
            if let Some(title) = fill_blank(record.title.as_deref(), snapshot.title.as_deref()) {
                update.changes.push(self.change(
                    record,
                    EnrichableField::Title,
                    record.title.clone(),
                    &title,
                ));
                update.title = Some(title);
            }
        }

        if self.selection.contains(EnrichableField::Phone) {
            if let Some(phone) = fill_blank(record.phone.as_deref(), snapshot.phone.as_deref()) {
                update.changes.push(self.change(
                    record,
                    EnrichableField::Phone,
                    record.phone.clone(),
                    &phone,
                ));
                update.phone = Some(phone);
            }
        }

        if self.selection.contains(EnrichableField::DirectorySnapshot) {
            update.source_data = self.merge_source_data(&record.source_data, snapshot);
        }

        if update.is_empty() {
            return Err(SkipReason::NothingToWrite);
        }
        Ok(update)
    }

    /// Merged `source_data`, or `None` if merging changes nothing.
    fn merge_source_data(&self, original: &Value, snapshot: &DirectorySnapshot) -> Option<Value> {
        let namespace = self.config.source_data_namespace.as_str();
        let mut merged = match original {
            Value::Object(_) => original.clone(),
            _ => Value::Object(Map::new()),
        };

        let mut incoming = Map::new();
        incoming.insert(namespace.to_string(), directory_payload(snapshot));
        deep_merge(&mut merged, &Value::Object(incoming));

        (merged.to_string() != original.to_string()).then_some(merged)
    }

    fn change(
        &self,
        record: &StaffRecord,
        field: EnrichableField,
        previous: Option<String>,
        new: &str,
    ) -> FieldChange {
        FieldChange {
            entity_id: record.id,
            field,
            previous,
            new: Some(new.to_string()),
            source_ref: self.config.source_ref(field),
        }
    }
}

/// The incoming value, if the current one is blank and the incoming one isn't.
fn fill_blank(current: Option<&str>, incoming: Option<&str>) -> Option<String> {
    if !is_blank(current) || is_blank(incoming) {
        return None;
    }
    incoming.map(|v| v.trim().to_string())
}

/// Structured provenance payload for one directory user.
fn directory_payload(snapshot: &DirectorySnapshot) -> Value {
    let mut payload = Map::new();
    payload.insert(
        "external_id".to_string(),
        Value::String(snapshot.external_id.clone()),
    );
    let optional = [
        ("primary_email", &snapshot.primary_email),
        ("full_name", &snapshot.full_name),
        ("title", &snapshot.title),
        ("phone", &snapshot.phone),
        ("department", &snapshot.department),
        ("org_unit_path", &snapshot.org_unit_path),
        ("thumbnail_photo_url", &snapshot.thumbnail_photo_url),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            payload.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    if !snapshot.attributes.is_empty() {
        payload.insert(
            "attributes".to_string(),
            Value::Object(snapshot.attributes.clone()),
        );
    }
    Value::Object(payload)
}
