//! Enrichment boundary: staff records, directory snapshots, run summary and
//! the append-only lineage rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::entity::EntityType;

/// Fields an enrichment run may write.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnrichableField {
    AvatarUrl,
    Title,
    Phone,
    DirectorySnapshot,
}

impl EnrichableField {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Live staff record as loaded from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: Uuid,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Provenance payloads keyed by namespace (e.g. `google_workspace`).
    #[serde(default = "empty_object")]
    pub source_data: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl StaffRecord {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            avatar_url: None,
            title: None,
            phone: None,
            source_data: empty_object(),
        }
    }
}

/// Point-in-time copy of a directory user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    pub external_id: String,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub org_unit_path: Option<String>,
    #[serde(default)]
    pub thumbnail_photo_url: Option<String>,
    #[serde(default)]
    pub is_suspended: bool,
    #[serde(default)]
    pub is_deleted: bool,
    /// Any further structured attributes the directory returned.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Link between a staff record and its directory identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMapping {
    pub entity_id: Uuid,
    pub external_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsUpdated {
    pub title: usize,
    pub phone: usize,
    pub avatar_url: usize,
}

/// `{enriched, skipped, total_mappings, fields_updated, source_snapshot_updates, selected_fields}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    pub enriched: usize,
    pub skipped: usize,
    pub total_mappings: usize,
    pub fields_updated: FieldsUpdated,
    pub source_snapshot_updates: usize,
    pub selected_fields: Vec<EnrichableField>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LineageSourceType {
    #[default]
    Api,
    Spreadsheet,
    Form,
    Manual,
}

/// Append-only audit row: one accepted field write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentChange {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub field_name: String,
    pub source_type: LineageSourceType,
    pub source_ref: String,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_flags_default_to_false() {
        let snap: DirectorySnapshot =
            serde_json::from_str(r#"{"external_id": "u-1", "title": "Engineer"}"#).unwrap();
        assert!(!snap.is_suspended);
        assert!(!snap.is_deleted);
        assert_eq!(snap.title.as_deref(), Some("Engineer"));
    }

    #[test]
    fn staff_record_defaults_source_data_to_object() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"id": "{id}"}}"#);
        let record: StaffRecord = serde_json::from_str(&json).unwrap();
        assert!(record.source_data.is_object());
        assert!(record.title.is_none());
    }

    #[test]
    fn enrichable_field_round_trips_snake_case() {
        assert_eq!(
            "directory_snapshot".parse::<EnrichableField>().unwrap(),
            EnrichableField::DirectorySnapshot
        );
        assert_eq!(EnrichableField::AvatarUrl.as_str(), "avatar_url");
    }
}
