//! Authority resolution: which sources are authoritative for which entities.
//!
//! For every (source, entity) pair where the source feeds at least one field,
//! the resolver folds the field-level authorities into an [`AuthorityAggregate`]
//! and counts the fields fed.
//!
//! Two aggregation rules exist:
//!
//! - [`AuthorityRule::SequentialFold`] replays the dashboard's historical
//!   transition table in field-processing order. Under that table a
//!   `reference` contribution never changes the aggregate and the aggregate
//!   can never leave `source_of_truth`, so `mixed` is unreachable.
//! - [`AuthorityRule::Symmetric`] classifies by set membership: all
//!   `source_of_truth` is `source_of_truth`, all `reference` is `reference`,
//!   anything else is `mixed`.
//!
//! Which one the dashboard should use is still open with stakeholders; the
//! fold is the default so existing graphs do not change colour.

use std::collections::{BTreeMap, HashSet};

use lineage_types::{Authority, AuthorityAggregate, EntityNode, EntityType, SourceRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityRule {
    #[default]
    SequentialFold,
    Symmetric,
}

/// One step of the historical transition table.
pub fn fold_step(current: AuthorityAggregate, contributed: Authority) -> AuthorityAggregate {
    match contributed {
        Authority::Reference => current,
        Authority::SourceOfTruth => match current {
            AuthorityAggregate::Reference => AuthorityAggregate::SourceOfTruth,
            AuthorityAggregate::SourceOfTruth => AuthorityAggregate::SourceOfTruth,
            AuthorityAggregate::Mixed => AuthorityAggregate::Mixed,
        },
    }
}

/// Aggregate a sequence of contributed authorities under `rule`.
///
/// Returns `None` for an empty sequence: a source that contributes nothing has
/// no aggregate for that entity.
pub fn aggregate<I>(rule: AuthorityRule, authorities: I) -> Option<AuthorityAggregate>
where
    I: IntoIterator<Item = Authority>,
{
    let mut acc = Accumulator::default();
    for authority in authorities {
        acc.observe(authority);
    }
    acc.finish(rule)
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    folded: AuthorityAggregate,
    saw_source_of_truth: bool,
    saw_reference: bool,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            folded: AuthorityAggregate::Reference,
            saw_source_of_truth: false,
            saw_reference: false,
        }
    }
}

impl Accumulator {
    fn observe(&mut self, authority: Authority) {
        self.folded = fold_step(self.folded, authority);
        match authority {
            Authority::SourceOfTruth => self.saw_source_of_truth = true,
            Authority::Reference => self.saw_reference = true,
        }
    }

    fn finish(&self, rule: AuthorityRule) -> Option<AuthorityAggregate> {
        if !self.saw_source_of_truth && !self.saw_reference {
            return None;
        }
        Some(match rule {
            AuthorityRule::SequentialFold => self.folded,
            AuthorityRule::Symmetric => match (self.saw_source_of_truth, self.saw_reference) {
                (true, false) => AuthorityAggregate::SourceOfTruth,
                (false, true) => AuthorityAggregate::Reference,
                _ => AuthorityAggregate::Mixed,
            },
        })
    }
}

/// Resolved authority of one source over one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntityLink {
    pub source_id: String,
    pub entity_type: EntityType,
    pub authority: AuthorityAggregate,
    /// Fields of the entity this source feeds (a field fed twice counts once).
    pub mapped_field_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMapping {
    links: BTreeMap<(String, EntityType), SourceEntityLink>,
    entity_mapped_counts: BTreeMap<EntityType, usize>,
    entity_field_counts: BTreeMap<EntityType, usize>,
}

impl ResolvedMapping {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn link(&self, source_id: &str, entity_type: EntityType) -> Option<&SourceEntityLink> {
        self.links.get(&(source_id.to_string(), entity_type))
    }

    pub fn links(&self) -> impl Iterator<Item = &SourceEntityLink> {
        self.links.values()
    }

    /// Links of one source in canonical entity order.
    pub fn links_for_source<'a>(
        &'a self,
        source_id: &'a str,
    ) -> impl Iterator<Item = &'a SourceEntityLink> + 'a {
        EntityType::CANONICAL_ORDER
            .into_iter()
            .filter_map(move |entity| self.link(source_id, entity))
    }

    pub fn mapped_count(&self, source_id: &str, entity_type: EntityType) -> usize {
        self.link(source_id, entity_type)
            .map(|l| l.mapped_field_count)
            .unwrap_or(0)
    }

    /// Fields of `entity_type` with at least one source.
    pub fn entity_mapped_count(&self, entity_type: EntityType) -> usize {
        self.entity_mapped_counts
            .get(&entity_type)
            .copied()
            .unwrap_or(0)
    }

    pub fn entity_field_count(&self, entity_type: EntityType) -> usize {
        self.entity_field_counts
            .get(&entity_type)
            .copied()
            .unwrap_or(0)
    }

    /// Entity receiving the most fields from `source_id`.
    ///
    /// Ties go to the entity earliest in canonical order.
    pub fn primary_entity(&self, source_id: &str) -> Option<EntityType> {
        let mut best: Option<(EntityType, usize)> = None;
        for link in self.links_for_source(source_id) {
            match best {
                Some((_, count)) if count >= link.mapped_field_count => {}
                _ => best = Some((link.entity_type, link.mapped_field_count)),
            }
        }
        best.map(|(entity, _)| entity)
    }

    /// Total fields fed by `source_id` across every entity.
    pub fn source_total(&self, source_id: &str) -> usize {
        self.links_for_source(source_id)
            .map(|l| l.mapped_field_count)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorityResolver {
    rule: AuthorityRule,
}

impl AuthorityResolver {
    pub fn new(rule: AuthorityRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> AuthorityRule {
        self.rule
    }

    /// Resolve every (source, entity) pair.
    ///
    /// Fields are visited in declaration order (groups, then fields, then the
    /// field's source rows) because the fold is order-sensitive by definition.
    /// Field sources naming a source missing from `sources` are still resolved;
    /// the graph builder decides what to render.
    pub fn resolve<'a, I>(&self, entities: I, sources: &[SourceRecord]) -> ResolvedMapping
    where
        I: IntoIterator<Item = &'a EntityNode>,
    {
        let mut accumulators: BTreeMap<(String, EntityType), (Accumulator, usize)> =
            BTreeMap::new();
        let mut resolved = ResolvedMapping::default();

        for entity in entities {
            let entity_type = entity.entity_type;
            for field in entity.fields() {
                *resolved
                    .entity_field_counts
                    .entry(entity_type)
                    .or_default() += 1;
                if field.has_sources() {
                    *resolved
                        .entity_mapped_counts
                        .entry(entity_type)
                        .or_default() += 1;
                }

                let mut counted: HashSet<&str> = HashSet::new();
                for fs in &field.sources {
                    let (acc, fields) = accumulators
                        .entry((fs.source_id.clone(), entity_type))
                        .or_insert_with(|| (Accumulator::default(), 0));
                    acc.observe(fs.authority);
                    if counted.insert(fs.source_id.as_str()) {
                        *fields += 1;
                    }
                }
            }
        }

        for ((source_id, entity_type), (acc, fields)) in accumulators {
            let Some(authority) = acc.finish(self.rule) else {
                continue;
            };
            resolved.links.insert(
                (source_id.clone(), entity_type),
                SourceEntityLink {
                    source_id,
                    entity_type,
                    authority,
                    mapped_field_count: fields,
                },
            );
        }

        let unknown: Vec<&str> = resolved
            .links
            .keys()
            .map(|(id, _)| id.as_str())
            .filter(|id| !sources.iter().any(|s| s.id == *id))
            .collect();
        if !unknown.is_empty() {
            debug!(?unknown, "field sources reference unlisted sources");
        }

        debug!(
            rule = ?self.rule,
            links = resolved.links.len(),
            "Resolved source authority"
        );
        resolved
    }
}
