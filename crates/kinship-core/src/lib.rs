//! # kinship-core
//!
//! The relationship-graph consistency engine for Kinship - THE LOGIC.
//!
//! This crate keeps a bidirectional family graph consistent: profiles joined
//! by typed, reciprocal edges (parent/child, sibling, spouse), grouped into
//! lineages with derived suggestions, and merged by an atomic transplant when
//! two nodes turn out to describe the same family branch.
//!
//! ## Layers
//!
//! - `store` / `storage`: the `RelationshipStore` repository and its memory
//!   and redb backends
//! - `reciprocity`: edge plus mirror edge, never one without the other
//! - `guard`: checks run before any edge is written
//! - `cascade`: scenario-derived edges, drained from a worklist
//! - `suggestions` / `lineage`: bounded BFS feeding group suggestion sets
//! - `transplant`: the multi-record node rewrite
//! - `engine`: the facade that wraps each operation in a unit of work
//!
//! ## Architectural Constraints
//!
//! - No module-level state: all mutation goes through explicit units of work
//! - Has NO async, NO network dependencies (pure Rust)
//! - Every fallible path returns `KinshipError`; nothing panics

// =============================================================================
// MODULES
// =============================================================================

pub mod cascade;
pub mod config;
pub mod engine;
pub mod guard;
pub mod integrity;
pub mod lineage;
pub mod primitives;
pub mod reciprocity;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod suggestions;
pub mod transplant;
pub mod tree;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    EdgeList, EdgeSet, EntryRef, Gender, GroupId, KinEntry, KinshipError, LineageGroup, Profile,
    ProfileId, RecordStatus, RelationshipPair, RelationshipRecord, RelationshipType, Scenario,
    SpouseEntry, TransplantMode,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use cascade::{CascadeReport, EdgeOp, Worklist};
pub use config::EngineConfig;
pub use engine::{KinshipEngine, LinkOutcome};
pub use integrity::Violation;
pub use snapshot::Snapshot;
pub use transplant::TransplantOutcome;
pub use tree::{FamilyTree, TreeMember, TreeSpouse};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::RedbStore;
pub use storage::redb_store::StoreCounts;
pub use store::{MemoryStore, RecordReader, RelationshipStore, StoreContents, UnitOfWork};
