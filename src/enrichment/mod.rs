//! Directory-snapshot enrichment of staff records.
//!
//! - [`selection`]: which optional fields a run may write
//! - [`merger`]: per-record merge policy
//! - [`store`]: storage ports and in-memory implementations
//! - [`run`]: the sequential run driver

pub mod merge;
pub mod merger;
pub mod run;
pub mod selection;
pub mod store;

pub use merge::{deep_merge, is_blank};
pub use merger::{EnrichmentMerger, FieldChange, FieldUpdate, SkipReason};
pub use run::{EnrichmentReport, EnrichmentRun};
pub use selection::FieldSelection;
pub use store::{EntityStore, InMemoryEntityStore, SnapshotSource};
