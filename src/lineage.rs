//! Lineage recording - append-only audit rows for accepted field writes.
//!
//! The field write is the source of truth; the audit row is best effort. A
//! failed batch insert is logged at `warn`, counted in [`RecorderStats`], and
//! never rolls back or fails the enrichment run that produced it.

use chrono::{DateTime, Utc};
use lineage_types::{EnrichmentChange, EntityType, LineageSourceType};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::enrichment::FieldChange;
use crate::error::SinkError;

/// Persistence port for audit rows.
pub trait LineageSink {
    /// Insert every row or none; returns the number inserted.
    fn insert_batch(&mut self, rows: &[EnrichmentChange]) -> Result<usize, SinkError>;
}

impl<S: LineageSink + ?Sized> LineageSink for &mut S {
    fn insert_batch(&mut self, rows: &[EnrichmentChange]) -> Result<usize, SinkError> {
        (**self).insert_batch(rows)
    }
}

/// In-memory sink used by the CLI and tests.
#[derive(Debug, Default)]
pub struct InMemoryLineageSink {
    rows: Vec<EnrichmentChange>,
    fail_with: Option<String>,
}

impl InMemoryLineageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every insert fails.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            fail_with: Some(reason.into()),
        }
    }

    pub fn rows(&self) -> &[EnrichmentChange] {
        &self.rows
    }
}

impl LineageSink for InMemoryLineageSink {
    fn insert_batch(&mut self, rows: &[EnrichmentChange]) -> Result<usize, SinkError> {
        if let Some(reason) = &self.fail_with {
            return Err(SinkError::Unavailable(reason.clone()));
        }
        self.rows.extend_from_slice(rows);
        Ok(rows.len())
    }
}

/// Result of one recording attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineageOutcome {
    Nothing,
    Recorded { rows: usize },
    Failed { rows: usize, error: String },
}

impl LineageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Operational counters; a non-zero `rows_lost` means provenance went missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecorderStats {
    pub batches: u64,
    pub rows_written: u64,
    pub failures: u64,
    pub rows_lost: u64,
}

pub struct LineageRecorder<S> {
    sink: S,
    entity_type: EntityType,
    source_type: LineageSourceType,
    stats: RecorderStats,
}

impl<S: LineageSink> LineageRecorder<S> {
    pub fn new(sink: S, entity_type: EntityType, source_type: LineageSourceType) -> Self {
        Self {
            sink,
            entity_type,
            source_type,
            stats: RecorderStats::default(),
        }
    }

    pub fn stats(&self) -> RecorderStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn record(&mut self, changes: &[FieldChange]) -> LineageOutcome {
        self.record_at(changes, Utc::now())
    }

    /// Record `changes` stamped with `changed_at`.
    pub fn record_at(&mut self, changes: &[FieldChange], changed_at: DateTime<Utc>) -> LineageOutcome {
        if changes.is_empty() {
            return LineageOutcome::Nothing;
        }

        let rows: Vec<EnrichmentChange> = changes
            .iter()
            .map(|change| self.to_row(change, changed_at))
            .collect();

        self.stats.batches += 1;
        match self.sink.insert_batch(&rows) {
            Ok(written) => {
                self.stats.rows_written += written as u64;
                info!(rows = written, "Recorded enrichment lineage");
                LineageOutcome::Recorded { rows: written }
            }
            Err(err) => {
                self.stats.failures += 1;
                self.stats.rows_lost += rows.len() as u64;
                warn!(
                    rows = rows.len(),
                    error = %err,
                    "Lineage insert failed; field writes stand without audit rows"
                );
                LineageOutcome::Failed {
                    rows: rows.len(),
                    error: err.to_string(),
                }
            }
        }
    }

    fn to_row(&self, change: &FieldChange, changed_at: DateTime<Utc>) -> EnrichmentChange {
        EnrichmentChange {
            id: Uuid::new_v4(),
            entity_type: self.entity_type,
            entity_id: change.entity_id,
            field_name: change.field.as_str().to_string(),
            source_type: self.source_type,
            source_ref: change.source_ref.clone(),
            previous_value: change.previous.clone(),
            new_value: change.new.clone(),
            changed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_types::EnrichableField;

    fn change(field: EnrichableField) -> FieldChange {
        FieldChange {
            entity_id: Uuid::new_v4(),
            field,
            previous: None,
            new: Some("value".into()),
            source_ref: format!("Google Workspace → Directory Snapshot → {}", field),
        }
    }

    #[test]
    fn records_one_row_per_change() {
        let mut recorder = LineageRecorder::new(
            InMemoryLineageSink::new(),
            EntityType::Staff,
            LineageSourceType::Api,
        );
        let at = Utc::now();
        let outcome = recorder.record_at(
            &[change(EnrichableField::Title), change(EnrichableField::Phone)],
            at,
        );
        assert_eq!(outcome, LineageOutcome::Recorded { rows: 2 });

        let rows = recorder.sink().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field_name, "title");
        assert_eq!(rows[1].source_ref, "Google Workspace → Directory Snapshot → phone");
        assert!(rows.iter().all(|r| r.changed_at == at));
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[test]
    fn empty_batch_skips_the_sink() {
        let mut recorder = LineageRecorder::new(
            InMemoryLineageSink::failing("down"),
            EntityType::Staff,
            LineageSourceType::Api,
        );
        assert_eq!(recorder.record(&[]), LineageOutcome::Nothing);
        assert_eq!(recorder.stats(), RecorderStats::default());
    }

    #[test]
    fn sink_failure_is_counted_not_raised() {
        let mut recorder = LineageRecorder::new(
            InMemoryLineageSink::failing("connection reset"),
            EntityType::Staff,
            LineageSourceType::Api,
        );
        let outcome = recorder.record(&[change(EnrichableField::AvatarUrl)]);
        assert!(outcome.is_failure());
        assert_eq!(
            recorder.stats(),
            RecorderStats {
                batches: 1,
                rows_written: 0,
                failures: 1,
                rows_lost: 1,
            }
        );
    }
}
