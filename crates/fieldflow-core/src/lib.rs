//! fieldflow core - computed attributes and guarded state transitions.
//!
//! Record types are declared in the [`catalog`] and registered once in a
//! [`Registry`]. The [`ComputedResolver`] evaluates, writes and searches
//! computed attributes through their bound functions; the
//! [`TransitionGuard`] filters a batch by its transition table around an
//! operation and persists the new state. All persistence goes through a
//! [`RecordStore`].

pub mod catalog;
pub mod computed;
pub mod config;
pub mod error;
pub mod security;
pub mod store;
pub mod workflow;

pub use catalog::{
    AttributeDef, AttributeKind, BatchSupport, ComputedDef, FieldType, InvocationStyle,
    LoadingPolicy, RecordType, RecordTypeDef, Registry, TransitionTable,
};
pub use computed::{
    AttributeReader, ComputeContext, ComputedResolver, FunctionTable, Getter, NamedValueMap,
    Searcher, Setter, SetterContext, ValueMap,
};
pub use config::{CoreConfig, GuardConfig, MissingValuePolicy};
pub use error::{Error, Result};
pub use security::{AccessContext, AccessMode};
pub use store::{MemoryStore, RecordBatch, RecordHandle, RecordStore, WriteOp};
pub use workflow::{TransitionGuard, TransitionReport};

/// Re-export protocol types.
pub use fieldflow_proto as proto;
