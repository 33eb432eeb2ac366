//! Record type catalog.
//!
//! Declarations (attributes, computed descriptors, transition tables) are
//! plain data and load from JSON. The [`Registry`] binds them to functions
//! and freezes them.

mod entity;
mod field;
mod registry;
mod transition;
mod types;

pub use entity::RecordTypeDef;
pub use field::{
    AttributeDef, AttributeKind, BatchSupport, ComputedDef, InvocationStyle, LoadingPolicy,
};
pub use registry::{RecordType, Registry};
pub use transition::TransitionTable;
pub use types::FieldType;
