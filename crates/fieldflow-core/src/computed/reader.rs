//! Uniform attribute reads.

use tracing::trace;

use super::functions::{NamedValueMap, ValueMap};
use super::resolver::ComputedResolver;
use crate::catalog::{AttributeKind, LoadingPolicy, Registry};
use crate::error::Result;
use crate::security::AccessContext;
use crate::store::{RecordBatch, RecordHandle, RecordStore};
use fieldflow_proto::{RecordId, Value};

/// Reads stored and computed attributes through one entry point.
///
/// Stored attributes come from the store with the caller's context; computed
/// ones from the resolver.
pub struct AttributeReader<'a> {
    registry: &'a Registry,
    store: &'a dyn RecordStore,
}

impl<'a> AttributeReader<'a> {
    /// Create a reader.
    pub fn new(registry: &'a Registry, store: &'a dyn RecordStore) -> Self {
        Self { registry, store }
    }

    /// Read several attributes of a set of records.
    pub fn read(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        names: &[String],
    ) -> Result<NamedValueMap> {
        let rtype = self.registry.get(record_type)?;

        let mut stored = Vec::new();
        let mut computed = Vec::new();
        for name in names {
            match rtype.attribute(name)?.kind {
                AttributeKind::Stored { .. } => stored.push(name.as_str()),
                AttributeKind::Computed(_) => computed.push(name.clone()),
            }
        }
        trace!(
            record_type,
            stored = stored.len(),
            computed = computed.len(),
            "Reading attributes"
        );

        let mut result = NamedValueMap::with_capacity(names.len());
        for name in stored {
            let values = self.store.read_attribute(ctx, record_type, ids, name)?;
            result.insert(name.to_string(), values);
        }
        if !computed.is_empty() {
            let values = ComputedResolver::new(self.registry, self.store)
                .get_many(ctx, record_type, ids, &computed)?;
            result.extend(values);
        }
        Ok(result)
    }

    /// Read one attribute of a set of records.
    pub fn read_one(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        attribute: &str,
    ) -> Result<ValueMap> {
        let mut values = self.read(ctx, record_type, ids, &[attribute.to_string()])?;
        Ok(values.remove(attribute).unwrap_or_default())
    }

    /// Fill handle caches with every stored attribute and every eager
    /// computed attribute. Lazy computed attributes are left for [`get`].
    ///
    /// [`get`]: AttributeReader::get
    pub fn load(&self, ctx: &AccessContext, batch: &RecordBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let rtype = self.registry.get(batch.record_type())?;
        let names: Vec<String> = rtype
            .def()
            .attributes
            .iter()
            .filter(|a| match &a.kind {
                AttributeKind::Stored { .. } => true,
                AttributeKind::Computed(c) => c.loading == LoadingPolicy::Eager,
            })
            .map(|a| a.name.clone())
            .collect();

        let values = self.read(ctx, batch.record_type(), &batch.ids(), &names)?;
        for (name, per_record) in values {
            for handle in batch {
                if let Some(value) = per_record.get(&handle.id()) {
                    handle.cache_value(name.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Value of one attribute of one record, from its cache when present.
    pub fn get(&self, ctx: &AccessContext, handle: &RecordHandle, attribute: &str) -> Result<Value> {
        if let Some(value) = handle.cached(attribute) {
            return Ok(value);
        }
        let mut values = self.read_one(ctx, handle.record_type(), &[handle.id()], attribute)?;
        let value = values.remove(&handle.id()).unwrap_or(Value::Null);
        handle.cache_value(attribute, value.clone());
        Ok(value)
    }

    /// Fill one attribute into the caches of a whole batch.
    ///
    /// Records that already hold the attribute are not read again, so the
    /// first access on a batch computes the attribute for all of it.
    pub fn fetch(&self, ctx: &AccessContext, batch: &RecordBatch, attribute: &str) -> Result<()> {
        let ids: Vec<RecordId> = batch
            .iter()
            .filter(|h| !h.is_cached(attribute))
            .map(|h| h.id())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        let values = self.read_one(ctx, batch.record_type(), &ids, attribute)?;
        for handle in batch {
            if let Some(value) = values.get(&handle.id()) {
                handle.cache_value(attribute, value.clone());
            }
        }
        Ok(())
    }
}
