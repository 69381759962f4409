//! Layout algorithm - column-based positioning
//!
//! Three columns, left to right: sources, entities, and (for expanded
//! entities only) field groups. The entity column is a single top-to-bottom
//! pass: expanding one entity pushes every entity below it down.

use std::collections::BTreeSet;

use lineage_types::{EntityType, Position, SourceRecord};

use crate::authority::ResolvedMapping;
use crate::config::LayoutConfig;

/// Stroke width for a mapping edge carrying `mapped_field_count` fields.
///
/// `1.5 + 0.3 * n` saturating into `[1.5, 4.0]` with the default layout.
pub fn stroke_width(mapped_field_count: usize, layout: &LayoutConfig) -> f32 {
    let raw = layout.min_stroke_width + layout.stroke_per_field * mapped_field_count as f32;
    // not clamp(): min > max must not panic
    raw.max(layout.min_stroke_width).min(layout.max_stroke_width)
}

/// Position of one entity and of its group rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySlot {
    pub entity_type: EntityType,
    pub position: Position,
    pub expanded: bool,
    /// Empty unless `expanded`.
    pub group_positions: Vec<Position>,
}

/// Lay out the entity column.
///
/// `entities` are `(entity type, group count)` pairs already in canonical order.
pub fn layout_entity_column(
    entities: &[(EntityType, usize)],
    expanded: &BTreeSet<EntityType>,
    layout: &LayoutConfig,
) -> Vec<EntitySlot> {
    let mut slots = Vec::with_capacity(entities.len());
    let mut cursor_y = layout.top_y;

    for &(entity_type, group_count) in entities {
        let position = Position::new(layout.entity_x, cursor_y);
        let is_expanded = expanded.contains(&entity_type);

        let group_positions = if is_expanded {
            (0..group_count)
                .map(|i| {
                    Position::new(
                        layout.entity_x + layout.group_offset_x,
                        cursor_y + layout.group_start_y + i as f32 * layout.group_gap,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        cursor_y += if is_expanded {
            layout.group_start_y + group_count as f32 * layout.group_gap + layout.group_margin
        } else {
            layout.entity_gap
        };

        slots.push(EntitySlot {
            entity_type,
            position,
            expanded: is_expanded,
            group_positions,
        });
    }

    slots
}

/// A source with its ordering key and final position.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSlot<'a> {
    pub source: &'a SourceRecord,
    pub primary_entity: Option<EntityType>,
    pub position: Position,
}

/// Order sources by the canonical index of their primary entity.
///
/// Grouping sources next to the entity they mostly feed keeps mapping edges
/// from crossing. The sort is stable so sources sharing a primary entity keep
/// their input order; sources that feed nothing go last.
pub fn order_sources<'a>(
    sources: &'a [SourceRecord],
    resolved: &ResolvedMapping,
    layout: &LayoutConfig,
) -> Vec<SourceSlot<'a>> {
    let mut keyed: Vec<(&SourceRecord, Option<EntityType>)> = sources
        .iter()
        .map(|s| (s, resolved.primary_entity(&s.id)))
        .collect();

    keyed.sort_by_key(|(_, primary)| {
        primary
            .map(EntityType::canonical_index)
            .unwrap_or(usize::MAX)
    });

    keyed
        .into_iter()
        .enumerate()
        .map(|(row, (source, primary_entity))| SourceSlot {
            source,
            primary_entity,
            position: Position::new(layout.source_x, layout.top_y + row as f32 * layout.source_gap),
        })
        .collect()
}
