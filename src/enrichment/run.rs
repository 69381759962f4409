//! Enrichment run driver.
//!
//! Fetches every mapping and snapshot up front, then walks the records one at
//! a time: check the snapshot, load the record, merge, write. Lineage rows for
//! all accepted writes go out in a single batch at the end.

use std::collections::{BTreeMap, HashSet};

use lineage_types::{EnrichableField, EnrichmentSummary, StaffMapping, StaffRecord};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::merger::{EnrichmentMerger, FieldChange, SkipReason};
use super::selection::FieldSelection;
use super::store::{EntityStore, SnapshotSource};
use crate::config::EnrichmentConfig;
use crate::error::{LineageError, Result};
use crate::lineage::{LineageOutcome, LineageRecorder, LineageSink};

/// Summary plus the operational detail behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentReport {
    pub summary: EnrichmentSummary,
    pub skip_reasons: BTreeMap<SkipReason, usize>,
    pub lineage: LineageOutcome,
}

impl EnrichmentReport {
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skip_reasons.get(&reason).copied().unwrap_or(0)
    }
}

pub struct EnrichmentRun {
    merger: EnrichmentMerger,
}

impl EnrichmentRun {
    pub fn new(merger: EnrichmentMerger) -> Self {
        Self { merger }
    }

    /// Build a run from an optional request body; invalid bodies fall back to
    /// the configured default selection.
    pub fn from_request(request: Option<&Value>, config: &EnrichmentConfig) -> Self {
        let selection = FieldSelection::from_request(request, &config.default_fields);
        Self::new(EnrichmentMerger::new(selection, config.clone()))
    }

    pub fn merger(&self) -> &EnrichmentMerger {
        &self.merger
    }

    /// Run enrichment over every mapping in `store`.
    ///
    /// Fails only when the mapping list or the snapshot batch cannot be
    /// fetched. Everything per-record is counted as a skip.
    pub fn execute<E, S, L>(
        &self,
        store: &mut E,
        snapshots: &S,
        recorder: &mut LineageRecorder<L>,
    ) -> Result<EnrichmentReport>
    where
        E: EntityStore,
        S: SnapshotSource,
        L: LineageSink,
    {
        let mappings = store.mappings().map_err(LineageError::MappingsUnavailable)?;

        let mut summary = EnrichmentSummary {
            total_mappings: mappings.len(),
            selected_fields: self.merger.selection().to_vec(),
            ..EnrichmentSummary::default()
        };
        let mut skip_reasons: BTreeMap<SkipReason, usize> = BTreeMap::new();

        let (unique, duplicates) = dedup_mappings(mappings);
        if duplicates > 0 {
            warn!(duplicates, "Duplicate entity mappings skipped");
            summary.skipped += duplicates;
            *skip_reasons.entry(SkipReason::DuplicateMapping).or_default() += duplicates;
        }

        let external_ids: Vec<String> = unique
            .iter()
            .map(|m| m.external_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let snapshot_map = snapshots
            .snapshots(&external_ids)
            .map_err(LineageError::SnapshotsUnavailable)?;

        info!(
            mappings = unique.len(),
            snapshots = snapshot_map.len(),
            selected = ?summary.selected_fields,
            "Starting enrichment run"
        );

        let mut changes: Vec<FieldChange> = Vec::new();
        for mapping in &unique {
            let outcome = snapshot_map
                .get(&mapping.external_id)
                .ok_or(SkipReason::NoSnapshot)
                .and_then(|snapshot| {
                    self.merger.check_snapshot(snapshot)?;
                    let record = load_record(&*store, mapping.entity_id)?;
                    self.merger.merge(&record, snapshot)
                })
                .and_then(|update| {
                    store.apply(&update).map_err(|err| {
                        warn!(entity_id = %mapping.entity_id, error = %err, "Field write failed");
                        SkipReason::WriteFailed
                    })?;
                    Ok(update)
                });

            match outcome {
                Ok(update) => {
                    debug!(
                        entity_id = %mapping.entity_id,
                        fields = ?update.changed_fields(),
                        "Enriched record"
                    );
                    summary.enriched += 1;
                    for change in &update.changes {
                        match change.field {
                            EnrichableField::AvatarUrl => summary.fields_updated.avatar_url += 1,
                            EnrichableField::Title => summary.fields_updated.title += 1,
                            EnrichableField::Phone => summary.fields_updated.phone += 1,
                            EnrichableField::DirectorySnapshot => {}
                        }
                    }
                    if update.source_data.is_some() {
                        summary.source_snapshot_updates += 1;
                    }
                    changes.extend(update.changes);
                }
                Err(reason) => {
                    debug!(entity_id = %mapping.entity_id, %reason, "Skipped record");
                    summary.skipped += 1;
                    *skip_reasons.entry(reason).or_default() += 1;
                }
            }
        }

        let lineage = recorder.record(&changes);

        info!(
            enriched = summary.enriched,
            skipped = summary.skipped,
            lineage_rows = changes.len(),
            "Enrichment run complete"
        );

        Ok(EnrichmentReport {
            summary,
            skip_reasons,
            lineage,
        })
    }
}

fn load_record<E: EntityStore>(
    store: &E,
    entity_id: Uuid,
) -> std::result::Result<StaffRecord, SkipReason> {
    match store.load(entity_id) {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(SkipReason::RecordMissing),
        Err(err) => {
            warn!(entity_id = %entity_id, error = %err, "Cannot read record");
            Err(SkipReason::RecordUnavailable)
        }
    }
}

/// First mapping per entity id wins; returns the kept mappings and the number dropped.
fn dedup_mappings(mappings: Vec<StaffMapping>) -> (Vec<StaffMapping>, usize) {
    let mut seen = HashSet::new();
    let total = mappings.len();
    let unique: Vec<StaffMapping> = mappings
        .into_iter()
        .filter(|m| seen.insert(m.entity_id))
        .collect();
    let dropped = total - unique.len();
    (unique, dropped)
}
