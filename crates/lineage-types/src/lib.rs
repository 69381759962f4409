//! Shared Wire Types for Field Lineage
//!
//! This crate is the SINGLE SOURCE OF TRUTH for all types crossing the JSON
//! boundaries of the lineage engine.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐  GraphDocument   ┌──────────────────┐  FlowGraph   ┌──────────────────┐
//! │  Dashboard API   │ ───────────────► │  field-lineage   │ ───────────► │  Graph renderer  │
//! │  (mapping rows)  │                  │  (pure core)     │              │  (client)        │
//! └──────────────────┘                  └──────────────────┘              └──────────────────┘
//!          │ StaffRecord / DirectorySnapshot        │ EnrichmentSummary / EnrichmentChange
//!          └───────────────────────────────────────►┘
//! ```
//!
//! ## Rules
//!
//! 1. All boundary types live here - the core never defines inline wire structs
//! 2. Tagged enums only: `#[serde(tag = "type")]`
//! 3. Closed enums for entity types and authorities; free-form strings only where
//!    the input may legitimately reference something this core does not know

pub mod enrichment;
pub mod entity;
pub mod graph;
pub mod source;

pub use enrichment::*;
pub use entity::*;
pub use graph::*;
pub use source::*;
