//! Field lineage for the ops dashboard.
//!
//! Three concerns over already-fetched, in-memory data:
//!
//! - [`authority`]: which source feeds which entity, and whether it is
//!   authoritative
//! - [`graph`]: the source → entity → field-group flow graph, with a
//!   memoising [`cache::GraphCache`]
//! - [`enrichment`] + [`lineage`]: fill blank staff fields from directory
//!   snapshots and record one audit row per accepted write
//!
//! Wire types live in the `lineage-types` crate and are re-exported here.

pub mod authority;
pub mod cache;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod graph;
pub mod lineage;
pub mod telemetry;

pub use authority::{AuthorityResolver, AuthorityRule, ResolvedMapping, SourceEntityLink};
pub use cache::{CacheStats, GraphCache};
pub use config::{ConfigLoader, LineageConfig};
pub use enrichment::{
    EnrichmentMerger, EnrichmentReport, EnrichmentRun, EntityStore, FieldSelection,
    InMemoryEntityStore, SkipReason, SnapshotSource,
};
pub use error::{LineageError, Result};
pub use graph::GraphBuilder;
pub use lineage::{InMemoryLineageSink, LineageOutcome, LineageRecorder, LineageSink};

pub use lineage_types;
