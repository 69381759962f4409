//! Memoisation of built flow graphs.
//!
//! Graph building is referentially transparent, so results are keyed by a
//! BLAKE3 hash of everything that feeds the build: the document, the expanded
//! entity set, and the builder's layout and authority rule. Entries expire
//! after `ttl` and are swept on every miss; callers that learn the mapping
//! changed call [`GraphCache::invalidate_all`].

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use lineage_types::{EntityType, FlowGraph, GraphDocument};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::graph::GraphBuilder;

#[derive(Debug, Clone)]
struct CachedGraph {
    graph: FlowGraph,
    built_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct GraphCache {
    ttl: Duration,
    entries: HashMap<String, CachedGraph>,
    hits: u64,
    misses: u64,
}

impl GraphCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl())
    }

    /// Content hash of a build request.
    pub fn cache_key(
        builder: &GraphBuilder,
        document: &GraphDocument,
        expanded: &BTreeSet<EntityType>,
    ) -> Result<String> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&serde_json::to_vec(document)?);
        hasher.update(b"\x00expanded:");
        for entity in expanded {
            hasher.update(entity.as_str().as_bytes());
            hasher.update(b",");
        }
        hasher.update(b"\x00layout:");
        hasher.update(&serde_json::to_vec(builder.layout())?);
        hasher.update(b"\x00rule:");
        hasher.update(&serde_json::to_vec(&builder.rule())?);
        Ok(hasher.finalize().to_hex().to_string())
    }

    pub fn get_or_build(
        &mut self,
        builder: &GraphBuilder,
        document: &GraphDocument,
        expanded: &BTreeSet<EntityType>,
    ) -> Result<FlowGraph> {
        self.get_or_build_at(builder, document, expanded, Instant::now())
    }

    /// [`Self::get_or_build`] with an explicit clock reading.
    pub fn get_or_build_at(
        &mut self,
        builder: &GraphBuilder,
        document: &GraphDocument,
        expanded: &BTreeSet<EntityType>,
        now: Instant,
    ) -> Result<FlowGraph> {
        let key = Self::cache_key(builder, document, expanded)?;

        if let Some(entry) = self.entries.get(&key) {
            if now.saturating_duration_since(entry.built_at) < self.ttl {
                self.hits += 1;
                return Ok(entry.graph.clone());
            }
            debug!(key = %&key[..12], "graph cache entry expired");
        }

        self.misses += 1;
        let evicted = self.evict_expired(now);
        if evicted > 0 {
            debug!(evicted, "evicted expired graph cache entries");
        }
        let graph = builder.build(document, expanded);
        self.entries.insert(
            key,
            CachedGraph {
                graph: graph.clone(),
                built_at: now,
            },
        );
        Ok(graph)
    }

    /// Drop entries older than `ttl`.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.built_at) < ttl);
        before - self.entries.len()
    }

    pub fn invalidate_all(&mut self) {
        debug!(entries = self.entries.len(), "graph cache invalidated");
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_types::{EntityNode, FieldGroup};

    fn document() -> GraphDocument {
        GraphDocument {
            entities: vec![EntityNode::new(
                EntityType::Partner,
                vec![FieldGroup::new("Basics", vec![])],
            )],
            ..GraphDocument::default()
        }
    }

    #[test]
    fn hit_within_ttl_and_rebuild_after() {
        let builder = GraphBuilder::default();
        let mut cache = GraphCache::new(Duration::from_secs(60));
        let start = Instant::now();
        let expanded = BTreeSet::new();

        let first = cache
            .get_or_build_at(&builder, &document(), &expanded, start)
            .unwrap();
        let second = cache
            .get_or_build_at(&builder, &document(), &expanded, start + Duration::from_secs(30))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 1);

        cache
            .get_or_build_at(&builder, &document(), &expanded, start + Duration::from_secs(61))
            .unwrap();
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn miss_sweeps_expired_entries() {
        let builder = GraphBuilder::default();
        let mut cache = GraphCache::new(Duration::from_secs(1));
        let start = Instant::now();

        for i in 0..50u64 {
            let document = GraphDocument {
                entities: vec![EntityNode::new(
                    EntityType::Partner,
                    vec![FieldGroup::new(format!("Group {i}"), vec![])],
                )],
                ..GraphDocument::default()
            };
            cache
                .get_or_build_at(
                    &builder,
                    &document,
                    &BTreeSet::new(),
                    start + Duration::from_secs(10 * i),
                )
                .unwrap();
            assert_eq!(cache.stats().entries, 1);
        }
        assert_eq!(cache.stats().misses, 50);
    }

    #[test]
    fn expanded_set_is_part_of_the_key() {
        let builder = GraphBuilder::default();
        let collapsed = GraphCache::cache_key(&builder, &document(), &BTreeSet::new()).unwrap();
        let expanded = GraphCache::cache_key(
            &builder,
            &document(),
            &BTreeSet::from([EntityType::Partner]),
        )
        .unwrap();
        assert_ne!(collapsed, expanded);
    }

    #[test]
    fn invalidate_and_evict() {
        let builder = GraphBuilder::default();
        let mut cache = GraphCache::new(Duration::from_secs(10));
        let start = Instant::now();
        cache
            .get_or_build_at(&builder, &document(), &BTreeSet::new(), start)
            .unwrap();
        assert_eq!(cache.evict_expired(start + Duration::from_secs(5)), 0);
        assert_eq!(cache.evict_expired(start + Duration::from_secs(11)), 1);

        cache
            .get_or_build_at(&builder, &document(), &BTreeSet::new(), start)
            .unwrap();
        cache.invalidate_all();
        assert_eq!(cache.stats().entries, 0);
    }
}
