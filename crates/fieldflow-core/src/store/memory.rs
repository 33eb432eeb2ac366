//! In-memory record store.

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::RecordStore;
use crate::error::Result;
use crate::security::{AccessContext, AccessMode};
use fieldflow_proto::{RecordId, Value};

/// One `write_attribute` call as seen by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    /// Record type written.
    pub record_type: String,
    /// Records written, in call order.
    pub ids: Vec<RecordId>,
    /// Attribute written.
    pub attribute: String,
    /// Value written.
    pub value: Value,
    /// Access mode of the writer.
    pub mode: AccessMode,
}

type Row = HashMap<String, Value>;

/// A record store kept entirely in memory.
///
/// Attributes can be restricted so that only elevated contexts may read or
/// write them. Every write call is logged for inspection.
pub struct MemoryStore {
    rows: RwLock<HashMap<(String, RecordId), Row>>,
    restricted: RwLock<HashSet<(String, String)>>,
    writes: Mutex<Vec<WriteOp>>,
    context: AccessContext,
}

impl MemoryStore {
    /// Create an empty store whose ambient context is `context`.
    pub fn new(context: AccessContext) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            restricted: RwLock::new(HashSet::new()),
            writes: Mutex::new(Vec::new()),
            context,
        }
    }

    /// Insert or replace a record.
    pub fn insert<I, K>(&self, record_type: &str, id: RecordId, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let row = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.rows.write().insert((record_type.to_string(), id), row);
    }

    /// Allow access to an attribute only in elevated mode.
    pub fn restrict(&self, record_type: &str, attribute: &str) {
        self.restricted
            .write()
            .insert((record_type.to_string(), attribute.to_string()));
    }

    /// Read a value directly, bypassing access checks and the write log.
    pub fn peek(&self, record_type: &str, id: RecordId, attribute: &str) -> Value {
        self.rows
            .read()
            .get(&(record_type.to_string(), id))
            .and_then(|row| row.get(attribute).cloned())
            .unwrap_or(Value::Null)
    }

    /// Write calls received so far.
    pub fn writes(&self) -> Vec<WriteOp> {
        self.writes.lock().clone()
    }

    /// Forget the write log.
    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    fn check_access(&self, ctx: &AccessContext, record_type: &str, attribute: &str) -> Result<()> {
        let restricted = self
            .restricted
            .read()
            .contains(&(record_type.to_string(), attribute.to_string()));
        if restricted {
            ctx.require_elevated(&format!("{}.{}", record_type, attribute))?;
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(AccessContext::default())
    }
}

impl RecordStore for MemoryStore {
    fn read_attribute(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        attribute: &str,
    ) -> Result<HashMap<RecordId, Value>> {
        self.check_access(ctx, record_type, attribute)?;
        trace!(record_type, attribute, count = ids.len(), "memory read");

        let rows = self.rows.read();
        let key = record_type.to_string();
        Ok(ids
            .iter()
            .map(|id| {
                let value = rows
                    .get(&(key.clone(), *id))
                    .and_then(|row| row.get(attribute).cloned())
                    .unwrap_or(Value::Null);
                (*id, value)
            })
            .collect())
    }

    fn write_attribute(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        attribute: &str,
        value: &Value,
    ) -> Result<()> {
        self.check_access(ctx, record_type, attribute)?;
        trace!(record_type, attribute, count = ids.len(), "memory write");

        {
            let mut rows = self.rows.write();
            for id in ids {
                rows.entry((record_type.to_string(), *id))
                    .or_default()
                    .insert(attribute.to_string(), value.clone());
            }
        }

        self.writes.lock().push(WriteOp {
            record_type: record_type.to_string(),
            ids: ids.to_vec(),
            attribute: attribute.to_string(),
            value: value.clone(),
            mode: ctx.mode,
        });
        Ok(())
    }

    fn current_context(&self) -> AccessContext {
        self.context.clone()
    }
}
