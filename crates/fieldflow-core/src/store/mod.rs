//! Record store seam.
//!
//! The resolver and the transition guard never persist anything on their
//! own; every read and write goes through a [`RecordStore`]. Isolation and
//! locking are the store's business. Within one call the core expects to read
//! its own writes.

mod handle;
mod memory;

pub use handle::{RecordBatch, RecordHandle};
pub use memory::{MemoryStore, WriteOp};

use std::collections::HashMap;

use crate::error::Result;
use crate::security::AccessContext;
use fieldflow_proto::{RecordId, Value};

/// Storage for stored attributes.
pub trait RecordStore: Send + Sync {
    /// Read one stored attribute for a set of records.
    ///
    /// The result holds an entry for every requested id; records without a
    /// value map to `Value::Null`.
    fn read_attribute(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        attribute: &str,
    ) -> Result<HashMap<RecordId, Value>>;

    /// Write one stored attribute on a set of records in one call.
    fn write_attribute(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        attribute: &str,
        value: &Value,
    ) -> Result<()>;

    /// The ambient context of the current transaction.
    fn current_context(&self) -> AccessContext;

    /// Live handles for raw identifiers.
    fn browse(&self, record_type: &str, ids: &[RecordId]) -> RecordBatch {
        RecordBatch::from_ids(record_type, ids)
    }
}
