//! Graph boundary: the mapping document handed in, and the positioned flow
//! graph handed to the rendering client.

use serde::{Deserialize, Serialize};

use crate::entity::{AuthorityAggregate, EntityNode, EntityType};
use crate::source::{SourceRecord, SourceType};

// ============================================================================
// INPUT DOCUMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Reference,
    Junction,
}

/// One side of a relationship. `entity` stays a raw string so a reference to an
/// unknown entity type can be dropped instead of rejecting the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEnd {
    pub entity: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: RelationshipEnd,
    pub to: RelationshipEnd,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
}

impl Relationship {
    pub fn new(
        from: (&str, &str),
        to: (&str, &str),
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            from: RelationshipEnd {
                entity: from.0.to_string(),
                field: from.1.to_string(),
            },
            to: RelationshipEnd {
                entity: to.0.to_string(),
                field: to.1.to_string(),
            },
            relationship_type,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    #[serde(default)]
    pub total_fields: usize,
    #[serde(default)]
    pub mapped_fields: usize,
    #[serde(default)]
    pub source_count: usize,
    #[serde(default)]
    pub tab_count: usize,
}

/// `{entities, sources, relationships, stats}` as served by the dashboard API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub entities: Vec<EntityNode>,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<GraphStats>,
}

// ============================================================================
// OUTPUT GRAPH
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Source,
    Entity,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNodeData {
    pub source_id: String,
    pub label: String,
    pub source_type: SourceType,
    pub tab_count: usize,
    pub active_tab_count: usize,
    /// Fields this source feeds, summed over every entity.
    pub mapped_field_count: usize,
    /// Entity receiving the most fields from this source; drives row ordering.
    pub primary_entity: Option<EntityType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityNodeData {
    pub entity_type: EntityType,
    pub label: String,
    pub field_count: usize,
    pub mapped_field_count: usize,
    pub group_count: usize,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFieldSummary {
    pub name: String,
    pub label: String,
    pub is_mapped: bool,
    pub is_key: bool,
    pub source_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNodeData {
    pub entity_type: EntityType,
    pub name: String,
    pub field_count: usize,
    pub mapped_field_count: usize,
    /// `mapped / total`, 0.0 for an empty group.
    pub progress: f32,
    pub fields: Vec<GroupFieldSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeData {
    Source(SourceNodeData),
    Entity(EntityNodeData),
    Group(GroupNodeData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    pub data: NodeData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Mapping,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEdgeData {
    pub authority: AuthorityAggregate,
    pub mapped_field_count: usize,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEdgeData {
    pub relationship_type: RelationshipType,
    pub from_field: String,
    pub to_field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeData {
    Mapping(MappingEdgeData),
    Reference(ReferenceEdgeData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub kind: EdgeKind,
    pub source: String,
    pub target: String,
    pub weight: usize,
    pub data: EdgeData,
}

/// `{nodes, edges}` consumed by the graph-rendering client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub stats: GraphStats,
}

impl FlowGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_with_unknown_entity_still_parses() {
        let json = r#"{
            "from": {"entity": "vendor", "field": "id"},
            "to": {"entity": "partner", "field": "vendor_id"},
            "type": "junction"
        }"#;
        let rel: Relationship = serde_json::from_str(json).unwrap();
        assert_eq!(rel.from.entity, "vendor");
        assert_eq!(rel.relationship_type, RelationshipType::Junction);
    }

    #[test]
    fn node_data_is_tagged() {
        let data = NodeData::Entity(EntityNodeData {
            entity_type: EntityType::Asin,
            label: "ASINs".into(),
            field_count: 4,
            mapped_field_count: 2,
            group_count: 1,
            expanded: false,
        });
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "entity");
        assert_eq!(json["entityType"], "asin");
        assert_eq!(json["mappedFieldCount"], 2);
    }

    #[test]
    fn document_defaults_missing_sections() {
        let doc: GraphDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.entities.is_empty());
        assert!(doc.relationships.is_empty());
        assert!(doc.stats.is_none());
    }
}
