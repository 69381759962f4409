//! Flow graph: sources → entities → field groups.
//!
//! ## Architecture
//!
//! ```text
//! GraphDocument ──► AuthorityResolver ──► ResolvedMapping ──► GraphBuilder ──► FlowGraph
//!                                                         ▲
//!                                   expanded entity set ──┘
//! ```
//!
//! Building is deterministic: same document and expanded set produce the same
//! graph, which is what makes [`crate::cache::GraphCache`] sound.

pub mod builder;
pub mod layout;

pub use builder::{entity_node_id, group_node_id, source_node_id, GraphBuilder};
pub use layout::{layout_entity_column, order_sources, stroke_width, EntitySlot, SourceSlot};

use std::collections::BTreeSet;

use lineage_types::EntityType;

/// Parse a comma-separated expanded-entity list (`"partner,staff"`).
///
/// Unknown names are ignored, matching how relationships to unknown entity
/// types are dropped.
pub fn parse_expanded(value: &str) -> BTreeSet<EntityType> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(EntityType::parse)
        .collect()
}
