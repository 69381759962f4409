//! External systems (spreadsheets, forms, APIs) that supply entity field values.

use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceType {
    Spreadsheet,
    Form,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TabStatus {
    #[default]
    Active,
    Paused,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: TabStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default)]
    pub tabs: Vec<TabRef>,
}

impl SourceRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_type,
            tabs: Vec::new(),
        }
    }

    pub fn with_tab(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.tabs.push(TabRef {
            id: id.into(),
            name: name.into(),
            status: TabStatus::Active,
        });
        self
    }

    pub fn active_tab_count(&self) -> usize {
        self.tabs
            .iter()
            .filter(|t| t.status == TabStatus::Active)
            .count()
    }
}
