//! Flow-graph builder - turns a `GraphDocument` into positioned nodes and edges.
//!
//! Creates:
//! - one source node per listed source, ordered to reduce edge crossings
//! - one entity node per entity type present, in canonical order
//! - one group node per field group of every expanded entity
//! - mapping edges (source → entity) weighted by mapped-field count
//! - reference edges (entity → entity), one per unordered entity pair

use std::collections::{BTreeSet, HashMap, HashSet};

use lineage_types::{
    EdgeData, EdgeKind, EntityNode, EntityNodeData, EntityType, FlowGraph, GraphDocument,
    GraphEdge, GraphNode, GraphStats, GroupFieldSummary, GroupNodeData, MappingEdgeData,
    NodeData, NodeKind, ReferenceEdgeData, Relationship, SourceNodeData,
};
use tracing::debug;

use super::layout::{layout_entity_column, order_sources, stroke_width, EntitySlot, SourceSlot};
use crate::authority::{AuthorityResolver, AuthorityRule, ResolvedMapping};
use crate::config::{LayoutConfig, LineageConfig};

pub fn source_node_id(source_id: &str) -> String {
    format!("source:{}", source_id)
}

pub fn entity_node_id(entity_type: EntityType) -> String {
    format!("entity:{}", entity_type.as_str())
}

pub fn group_node_id(entity_type: EntityType, group_name: &str) -> String {
    format!("group:{}:{}", entity_type.as_str(), group_name)
}

/// Id for the `occurrence`-th group (1-based) named `group_name` under one entity.
///
/// The first keeps the plain id; repeats get a `#n` suffix.
fn unique_group_node_id(entity_type: EntityType, group_name: &str, occurrence: usize) -> String {
    let id = group_node_id(entity_type, group_name);
    if occurrence <= 1 {
        id
    } else {
        format!("{}#{}", id, occurrence)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    layout: LayoutConfig,
    resolver: AuthorityResolver,
}

impl GraphBuilder {
    pub fn new(layout: LayoutConfig, resolver: AuthorityResolver) -> Self {
        Self { layout, resolver }
    }

    pub fn from_config(config: &LineageConfig) -> Self {
        Self::new(
            config.layout.clone(),
            AuthorityResolver::new(config.authority.rule),
        )
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn rule(&self) -> AuthorityRule {
        self.resolver.rule()
    }

    /// Resolve authority and build the graph in one step.
    pub fn build(&self, document: &GraphDocument, expanded: &BTreeSet<EntityType>) -> FlowGraph {
        let entities = canonical_entities(&document.entities);
        let resolved = self
            .resolver
            .resolve(entities.iter().copied(), &document.sources);
        self.build_resolved(document, &resolved, expanded)
    }

    /// Build from an already-resolved mapping.
    ///
    /// An empty entity list yields an empty graph. Relationships naming an
    /// unknown or absent entity are dropped.
    pub fn build_resolved(
        &self,
        document: &GraphDocument,
        resolved: &ResolvedMapping,
        expanded: &BTreeSet<EntityType>,
    ) -> FlowGraph {
        let entities = canonical_entities(&document.entities);
        if entities.is_empty() {
            debug!("empty mapping document, returning empty graph");
            return FlowGraph::default();
        }

        let column: Vec<(EntityType, usize)> = entities
            .iter()
            .map(|e| (e.entity_type, e.groups.len()))
            .collect();
        let entity_slots = layout_entity_column(&column, expanded, &self.layout);
        let source_slots = order_sources(&document.sources, resolved, &self.layout);

        let mut graph = FlowGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            stats: compute_stats(document, &entities, resolved),
        };

        for slot in &source_slots {
            graph.nodes.push(self.source_node(slot, resolved));
        }
        for (entity, slot) in entities.iter().zip(&entity_slots) {
            graph.nodes.push(self.entity_node(entity, slot, resolved));
            if slot.expanded {
                let mut seen: HashMap<&str, usize> = HashMap::new();
                for (group, position) in entity.groups.iter().zip(&slot.group_positions) {
                    let occurrence = seen.entry(group.name.as_str()).or_default();
                    *occurrence += 1;
                    if *occurrence > 1 {
                        debug!(
                            entity = %entity.entity_type,
                            group = %group.name,
                            "repeated group name, suffixing node id"
                        );
                    }
                    graph.nodes.push(GraphNode {
                        id: unique_group_node_id(entity.entity_type, &group.name, *occurrence),
                        kind: NodeKind::Group,
                        position: *position,
                        data: NodeData::Group(group_data(entity.entity_type, group)),
                    });
                }
            }
        }

        let present: BTreeSet<EntityType> = entities.iter().map(|e| e.entity_type).collect();
        self.push_mapping_edges(&mut graph, &source_slots, resolved, &present);
        push_reference_edges(&mut graph, &document.relationships, &present);

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            expanded = expanded.len(),
            "Built flow graph"
        );
        graph
    }

    fn source_node(&self, slot: &SourceSlot<'_>, resolved: &ResolvedMapping) -> GraphNode {
        let source = slot.source;
        GraphNode {
            id: source_node_id(&source.id),
            kind: NodeKind::Source,
            position: slot.position,
            data: NodeData::Source(SourceNodeData {
                source_id: source.id.clone(),
                label: source.name.clone(),
                source_type: source.source_type,
                tab_count: source.tabs.len(),
                active_tab_count: source.active_tab_count(),
                mapped_field_count: resolved.source_total(&source.id),
                primary_entity: slot.primary_entity,
            }),
        }
    }

    fn entity_node(
        &self,
        entity: &EntityNode,
        slot: &EntitySlot,
        resolved: &ResolvedMapping,
    ) -> GraphNode {
        let entity_type = entity.entity_type;
        GraphNode {
            id: entity_node_id(entity_type),
            kind: NodeKind::Entity,
            position: slot.position,
            data: NodeData::Entity(EntityNodeData {
                entity_type,
                label: entity_type.display_label().to_string(),
                field_count: resolved.entity_field_count(entity_type),
                mapped_field_count: resolved.entity_mapped_count(entity_type),
                group_count: entity.groups.len(),
                expanded: slot.expanded,
            }),
        }
    }

    fn push_mapping_edges(
        &self,
        graph: &mut FlowGraph,
        source_slots: &[SourceSlot<'_>],
        resolved: &ResolvedMapping,
        present: &BTreeSet<EntityType>,
    ) {
        for slot in source_slots {
            let source_id = slot.source.id.as_str();
            for link in resolved.links_for_source(source_id) {
                if link.mapped_field_count == 0 || !present.contains(&link.entity_type) {
                    continue;
                }
                graph.edges.push(GraphEdge {
                    id: format!("mapping:{}:{}", source_id, link.entity_type.as_str()),
                    kind: EdgeKind::Mapping,
                    source: source_node_id(source_id),
                    target: entity_node_id(link.entity_type),
                    weight: link.mapped_field_count,
                    data: EdgeData::Mapping(MappingEdgeData {
                        authority: link.authority,
                        mapped_field_count: link.mapped_field_count,
                        stroke_width: stroke_width(link.mapped_field_count, &self.layout),
                    }),
                });
            }
        }
    }
}

/// First node per entity type, in canonical order.
fn canonical_entities(entities: &[EntityNode]) -> Vec<&EntityNode> {
    EntityType::CANONICAL_ORDER
        .into_iter()
        .filter_map(|entity_type| {
            let mut matching = entities.iter().filter(|e| e.entity_type == entity_type);
            let first = matching.next();
            if matching.next().is_some() {
                debug!(entity = %entity_type, "duplicate entity node ignored");
            }
            first
        })
        .collect()
}

fn group_data(entity_type: EntityType, group: &lineage_types::FieldGroup) -> GroupNodeData {
    let field_count = group.fields.len();
    let mapped_field_count = group.mapped_field_count();
    let progress = if field_count == 0 {
        0.0
    } else {
        mapped_field_count as f32 / field_count as f32
    };

    let fields = group
        .fields
        .iter()
        .map(|field| {
            let mut source_ids: Vec<String> = Vec::new();
            for fs in &field.sources {
                if !source_ids.contains(&fs.source_id) {
                    source_ids.push(fs.source_id.clone());
                }
            }
            GroupFieldSummary {
                name: field.name.clone(),
                label: field.label.clone(),
                is_mapped: field.has_sources(),
                is_key: field.is_key,
                source_ids,
            }
        })
        .collect();

    GroupNodeData {
        entity_type,
        name: group.name.clone(),
        field_count,
        mapped_field_count,
        progress,
        fields,
    }
}

/// One edge per unordered entity pair; the first relationship seen wins.
fn push_reference_edges(
    graph: &mut FlowGraph,
    relationships: &[Relationship],
    present: &BTreeSet<EntityType>,
) {
    let mut seen: HashSet<(EntityType, EntityType)> = HashSet::new();

    for rel in relationships {
        let (Some(from), Some(to)) = (
            EntityType::parse(&rel.from.entity),
            EntityType::parse(&rel.to.entity),
        ) else {
            debug!(
                from = %rel.from.entity,
                to = %rel.to.entity,
                "dropping relationship with unknown entity type"
            );
            continue;
        };
        if !present.contains(&from) || !present.contains(&to) {
            debug!(%from, %to, "dropping relationship to entity missing from document");
            continue;
        }

        let pair = if from <= to { (from, to) } else { (to, from) };
        if !seen.insert(pair) {
            continue;
        }

        graph.edges.push(GraphEdge {
            id: format!("reference:{}:{}", pair.0.as_str(), pair.1.as_str()),
            kind: EdgeKind::Reference,
            source: entity_node_id(from),
            target: entity_node_id(to),
            weight: 1,
            data: EdgeData::Reference(ReferenceEdgeData {
                relationship_type: rel.relationship_type,
                from_field: rel.from.field.clone(),
                to_field: rel.to.field.clone(),
            }),
        });
    }
}

fn compute_stats(
    document: &GraphDocument,
    entities: &[&EntityNode],
    resolved: &ResolvedMapping,
) -> GraphStats {
    GraphStats {
        total_fields: entities
            .iter()
            .map(|e| resolved.entity_field_count(e.entity_type))
            .sum(),
        mapped_fields: entities
            .iter()
            .map(|e| resolved.entity_mapped_count(e.entity_type))
            .sum(),
        source_count: document.sources.len(),
        tab_count: document.sources.iter().map(|s| s.tabs.len()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_types::{
        Authority, EntityField, FieldGroup, FieldSource, RelationshipType, SourceRecord,
        SourceType,
    };
    use pretty_assertions::assert_eq;

    fn fs(source_id: &str, authority: Authority) -> FieldSource {
        FieldSource {
            source_id: source_id.into(),
            source_name: source_id.into(),
            tab_name: "Main".into(),
            source_column: "A".into(),
            authority,
        }
    }

    fn entity(entity_type: EntityType, groups: Vec<(&str, Vec<EntityField>)>) -> EntityNode {
        EntityNode::new(
            entity_type,
            groups
                .into_iter()
                .map(|(name, fields)| FieldGroup::new(name, fields))
                .collect(),
        )
    }

    #[test]
    fn empty_document_builds_empty_graph() {
        let document = GraphDocument {
            sources: vec![SourceRecord::new("a", "A", SourceType::Api)],
            ..GraphDocument::default()
        };
        let graph = GraphBuilder::default().build(&document, &BTreeSet::new());
        assert!(graph.is_empty());
    }

    #[test]
    fn group_nodes_only_for_expanded_entities() {
        let document = GraphDocument {
            entities: vec![
                entity(
                    EntityType::Staff,
                    vec![
                        (
                            "Contact Info",
                            vec![EntityField::new("email", "Email")
                                .with_source(fs("dir", Authority::SourceOfTruth))],
                        ),
                        ("Role", vec![EntityField::new("title", "Title")]),
                    ],
                ),
                entity(EntityType::Partner, vec![("Basics", vec![])]),
            ],
            sources: vec![SourceRecord::new("dir", "Directory", SourceType::Api)],
            ..GraphDocument::default()
        };

        let graph =
            GraphBuilder::default().build(&document, &BTreeSet::from([EntityType::Staff]));

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "source:dir",
                "entity:partner",
                "entity:staff",
                "group:staff:Contact Info",
                "group:staff:Role",
            ]
        );

        let contact = graph.node("group:staff:Contact Info").unwrap();
        match &contact.data {
            NodeData::Group(data) => {
                assert_eq!(data.progress, 1.0);
                assert_eq!(data.fields[0].source_ids, vec!["dir".to_string()]);
            }
            other => panic!("unexpected node data: {:?}", other),
        }
        let role = graph.node("group:staff:Role").unwrap();
        assert_eq!(
            role.position.y - contact.position.y,
            LayoutConfig::default().group_gap
        );
    }

    #[test]
    fn repeated_group_names_get_distinct_ids() {
        let document = GraphDocument {
            entities: vec![entity(
                EntityType::Partner,
                vec![
                    (
                        "Contact Info",
                        vec![EntityField::new("email", "Email").as_key()],
                    ),
                    ("Contact Info", vec![EntityField::new("phone", "Phone")]),
                    ("Billing", vec![]),
                    ("Contact Info", vec![]),
                ],
            )],
            ..GraphDocument::default()
        };

        let graph =
            GraphBuilder::default().build(&document, &BTreeSet::from([EntityType::Partner]));
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "entity:partner",
                "group:partner:Contact Info",
                "group:partner:Contact Info#2",
                "group:partner:Billing",
                "group:partner:Contact Info#3",
            ]
        );
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());

        match &graph.node("group:partner:Contact Info#2").unwrap().data {
            NodeData::Group(data) => assert_eq!(data.fields[0].name, "phone"),
            other => panic!("unexpected node data: {:?}", other),
        }
        match &graph.node("group:partner:Contact Info").unwrap().data {
            NodeData::Group(data) => assert!(data.fields[0].is_key),
            other => panic!("unexpected node data: {:?}", other),
        }
    }

    #[test]
    fn reference_edges_dedupe_unordered_pairs() {
        let document = GraphDocument {
            entities: vec![
                entity(EntityType::Partner, vec![]),
                entity(EntityType::Staff, vec![]),
                entity(EntityType::Asin, vec![]),
            ],
            relationships: vec![
                Relationship::new(
                    ("partner", "id"),
                    ("staff", "partner_id"),
                    RelationshipType::Reference,
                ),
                Relationship::new(
                    ("staff", "id"),
                    ("partner", "staff_id"),
                    RelationshipType::Junction,
                ),
                Relationship::new(("vendor", "id"), ("asin", "vendor_id"), RelationshipType::Reference),
            ],
            ..GraphDocument::default()
        };

        let graph = GraphBuilder::default().build(&document, &BTreeSet::new());
        let refs: Vec<&GraphEdge> = graph.edges_of_kind(EdgeKind::Reference).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].id, "reference:partner:staff");
        assert_eq!(refs[0].source, "entity:partner");
        match &refs[0].data {
            EdgeData::Reference(data) => {
                assert_eq!(data.relationship_type, RelationshipType::Reference)
            }
            other => panic!("unexpected edge data: {:?}", other),
        }
    }

    #[test]
    fn unlisted_sources_get_no_edges() {
        let document = GraphDocument {
            entities: vec![entity(
                EntityType::Asin,
                vec![(
                    "Listing",
                    vec![EntityField::new("price", "Price")
                        .with_source(fs("ghost", Authority::Reference))],
                )],
            )],
            ..GraphDocument::default()
        };
        let graph = GraphBuilder::default().build(&document, &BTreeSet::new());
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.stats.mapped_fields, 1);
    }
}
