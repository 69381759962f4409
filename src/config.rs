//! Configuration loader
//!
//! Loads `LineageConfig` from YAML. Every field has a default so a partial
//! file (or no file at all) is valid.

use anyhow::{Context, Result};
use lineage_types::{EnrichableField, EntityType, LineageSourceType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::authority::AuthorityRule;

pub const CONFIG_ENV_VAR: &str = "LINEAGE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/lineage.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    pub layout: LayoutConfig,
    pub authority: AuthorityConfig,
    pub enrichment: EnrichmentConfig,
    pub cache: CacheConfig,
}

/// Column positions and spacing for the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub source_x: f32,
    pub entity_x: f32,
    /// Horizontal offset of group nodes from their parent entity.
    pub group_offset_x: f32,
    pub top_y: f32,
    pub source_gap: f32,
    /// Footprint of a collapsed entity.
    pub entity_gap: f32,
    /// First group row, relative to the parent entity.
    pub group_start_y: f32,
    pub group_gap: f32,
    /// Extra space below the last group of an expanded entity.
    pub group_margin: f32,
    pub min_stroke_width: f32,
    pub max_stroke_width: f32,
    pub stroke_per_field: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            source_x: 0.0,
            entity_x: 420.0,
            group_offset_x: 260.0,
            top_y: 0.0,
            source_gap: 96.0,
            entity_gap: 160.0,
            group_start_y: 80.0,
            group_gap: 64.0,
            group_margin: 40.0,
            min_stroke_width: 1.5,
            max_stroke_width: 4.0,
            stroke_per_field: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub rule: AuthorityRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Selection used when a request carries no valid `fields`.
    pub default_fields: Vec<EnrichableField>,
    /// Key under `source_data` that receives the directory payload.
    pub source_data_namespace: String,
    pub source_label: String,
    pub snapshot_label: String,
    pub source_type: LineageSourceType,
    pub entity_type: EntityType,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            default_fields: vec![
                EnrichableField::Title,
                EnrichableField::Phone,
                EnrichableField::DirectorySnapshot,
            ],
            source_data_namespace: "google_workspace".to_string(),
            source_label: "Google Workspace".to_string(),
            snapshot_label: "Directory Snapshot".to_string(),
            source_type: LineageSourceType::Api,
            entity_type: EntityType::Staff,
        }
    }
}

impl EnrichmentConfig {
    /// `"Google Workspace → Directory Snapshot → phone"`
    pub fn source_ref(&self, field: EnrichableField) -> String {
        format!(
            "{} → {} → {}",
            self.source_label,
            self.snapshot_label,
            field.as_str()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Resolve the config path.
    ///
    /// 1. `LINEAGE_CONFIG` environment variable
    /// 2. `config/lineage.yaml` relative to the working directory
    /// 3. none - built-in defaults
    pub fn from_env() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::new(path);
        }
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::new(DEFAULT_CONFIG_PATH);
        }
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Result<LineageConfig> {
        let Some(path) = &self.path else {
            debug!("no lineage config file, using defaults");
            return Ok(LineageConfig::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        info!(
            path = %path.display(),
            rule = ?config.authority.rule,
            "Loaded lineage config"
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<LineageConfig> {
        if content.trim().is_empty() {
            return Ok(LineageConfig::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
