//! Entity-side types: entity kinds, field groups, and the per-field source mapping.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

// ============================================================================
// ENTITY TYPE
// ============================================================================

/// Business object whose fields can be fed by external sources.
///
/// Variant order is the canonical layout order.
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
pub enum EntityType {
    Partner,
    Staff,
    Asin,
}

impl EntityType {
    /// Fixed top-to-bottom order of the entity column.
    pub const CANONICAL_ORDER: [EntityType; 3] =
        [EntityType::Partner, EntityType::Staff, EntityType::Asin];

    /// Position of this entity type in [`Self::CANONICAL_ORDER`].
    pub fn canonical_index(self) -> usize {
        match self {
            EntityType::Partner => 0,
            EntityType::Staff => 1,
            EntityType::Asin => 2,
        }
    }

    /// Lenient parse for references coming from loosely-typed input.
    ///
    /// Returns `None` for anything that is not a known entity type so callers
    /// can drop the reference instead of failing the whole document.
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().to_ascii_lowercase().parse().ok()
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Human label for the entity column.
    pub fn display_label(self) -> &'static str {
        match self {
            EntityType::Partner => "Partners",
            EntityType::Staff => "Staff",
            EntityType::Asin => "ASINs",
        }
    }
}

// ============================================================================
// AUTHORITY
// ============================================================================

/// Whether a source is definitive or advisory for a field it supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Authority {
    SourceOfTruth,
    Reference,
}

/// Authority of one source over one entity, folded from its field authorities.
///
/// Derived only; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthorityAggregate {
    SourceOfTruth,
    Reference,
    Mixed,
}

// ============================================================================
// FIELD MAPPING
// ============================================================================

/// One (field, source) mapping row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSource {
    pub source_id: String,
    pub source_name: String,
    #[serde(default)]
    pub tab_name: String,
    #[serde(default)]
    pub source_column: String,
    pub authority: Authority,
}

/// Cross-entity pointer carried by a field (e.g. `staff.partner_id -> partner.id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReference {
    pub entity: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub is_mapped: bool,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub sources: Vec<FieldSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<FieldReference>,
}

impl EntityField {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type: "text".to_string(),
            is_mapped: false,
            is_key: false,
            sources: Vec::new(),
            reference: None,
        }
    }

    /// Attach a source mapping; keeps `is_mapped` consistent with `sources`.
    pub fn with_source(mut self, source: FieldSource) -> Self {
        self.sources.push(source);
        self.is_mapped = true;
        self
    }

    pub fn as_key(mut self) -> Self {
        self.is_key = true;
        self
    }

    /// Mapped-ness derived from the source list, ignoring the wire flag.
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Named subset of an entity's fields (e.g. "Contact Info").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<EntityField>,
}

impl FieldGroup {
    pub fn new(name: impl Into<String>, fields: Vec<EntityField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn mapped_field_count(&self) -> usize {
        self.fields.iter().filter(|f| f.has_sources()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityNode {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub field_count: usize,
    #[serde(default)]
    pub mapped_field_count: usize,
    #[serde(default)]
    pub groups: Vec<FieldGroup>,
}

impl EntityNode {
    /// Build a node with counts derived from its groups.
    pub fn new(entity_type: EntityType, groups: Vec<FieldGroup>) -> Self {
        let mut node = Self {
            entity_type,
            field_count: 0,
            mapped_field_count: 0,
            groups,
        };
        node.recount();
        node
    }

    /// Recompute `field_count` / `mapped_field_count` and each field's
    /// `is_mapped` flag from the source lists.
    pub fn recount(&mut self) {
        let mut total = 0;
        let mut mapped = 0;
        for group in &mut self.groups {
            for field in &mut group.fields {
                field.is_mapped = field.has_sources();
                total += 1;
                if field.is_mapped {
                    mapped += 1;
                }
            }
        }
        self.field_count = total;
        self.mapped_field_count = mapped;
    }

    /// Fields in declaration order (groups first, then fields within a group).
    pub fn fields(&self) -> impl Iterator<Item = &EntityField> {
        self.groups.iter().flat_map(|g| g.fields.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn sot(source_id: &str) -> FieldSource {
        FieldSource {
            source_id: source_id.into(),
            source_name: source_id.to_uppercase(),
            tab_name: "Main".into(),
            source_column: "A".into(),
            authority: Authority::SourceOfTruth,
        }
    }

    #[test]
    fn canonical_order_matches_variant_order() {
        let iterated: Vec<_> = EntityType::iter().collect();
        assert_eq!(iterated, EntityType::CANONICAL_ORDER.to_vec());
        for (idx, entity) in EntityType::CANONICAL_ORDER.iter().enumerate() {
            assert_eq!(entity.canonical_index(), idx);
        }
    }

    #[test]
    fn lenient_parse_drops_unknown() {
        assert_eq!(EntityType::parse("Partner"), Some(EntityType::Partner));
        assert_eq!(EntityType::parse(" asin "), Some(EntityType::Asin));
        assert_eq!(EntityType::parse("vendor"), None);
    }

    #[test]
    fn recount_enforces_mapped_invariant() {
        let mut node = EntityNode::new(
            EntityType::Staff,
            vec![FieldGroup::new(
                "Contact Info",
                vec![
                    EntityField::new("email", "Email").with_source(sot("s1")),
                    EntityField::new("phone", "Phone"),
                ],
            )],
        );
        assert_eq!(node.field_count, 2);
        assert_eq!(node.mapped_field_count, 1);

        // A wire flag that lies is corrected on recount.
        node.groups[0].fields[1].is_mapped = true;
        node.recount();
        assert!(!node.groups[0].fields[1].is_mapped);
        assert_eq!(node.mapped_field_count, 1);
    }

    #[test]
    fn field_source_wire_format_is_camel_case() {
        let json = serde_json::to_value(sot("sheet-1")).unwrap();
        assert_eq!(json["sourceId"], "sheet-1");
        assert_eq!(json["authority"], "source_of_truth");
    }
}
