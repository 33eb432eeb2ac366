//! Contexts handed to getters and setters.

use std::ops::Deref;

use super::functions::{NamedValueMap, ValueMap};
use super::reader::AttributeReader;
use super::resolver::ComputedResolver;
use crate::catalog::{AttributeKind, RecordType, Registry};
use crate::error::Result;
use crate::security::AccessContext;
use crate::store::RecordStore;
use fieldflow_proto::{RecordId, Value};

/// What a getter can see: the registry, read access to the store and the
/// elevated access context of the call.
///
/// Reads go through [`AttributeReader`], so a getter may read other computed
/// attributes and resolution recurses. There is no write path.
pub struct ComputeContext<'a> {
    registry: &'a Registry,
    store: &'a dyn RecordStore,
    record_type: &'a RecordType,
    access: AccessContext,
}

impl<'a> ComputeContext<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        store: &'a dyn RecordStore,
        record_type: &'a RecordType,
        access: AccessContext,
    ) -> Self {
        Self {
            registry,
            store,
            record_type,
            access,
        }
    }

    /// Access context the getter runs with.
    pub fn access(&self) -> &AccessContext {
        &self.access
    }

    /// Record type whose attribute is being computed.
    pub fn record_type(&self) -> &RecordType {
        self.record_type
    }

    /// Registry the record type belongs to.
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Read one attribute of the current record type.
    pub fn read(&self, ids: &[RecordId], attribute: &str) -> Result<ValueMap> {
        self.read_from(self.record_type.name(), ids, attribute)
    }

    /// Read several attributes of the current record type.
    pub fn read_many(&self, ids: &[RecordId], attributes: &[String]) -> Result<NamedValueMap> {
        self.reader()
            .read(&self.access, self.record_type.name(), ids, attributes)
    }

    /// Read one attribute of any registered record type.
    pub fn read_from(&self, record_type: &str, ids: &[RecordId], attribute: &str) -> Result<ValueMap> {
        self.reader().read_one(&self.access, record_type, ids, attribute)
    }

    fn reader(&self) -> AttributeReader<'a> {
        AttributeReader::new(self.registry, self.store)
    }
}

/// What a setter can see: everything a getter sees, plus writes.
pub struct SetterContext<'a> {
    inner: ComputeContext<'a>,
}

impl<'a> SetterContext<'a> {
    pub(crate) fn new(inner: ComputeContext<'a>) -> Self {
        Self { inner }
    }

    /// Write an attribute of the current record type.
    pub fn write(&self, ids: &[RecordId], attribute: &str, value: &Value) -> Result<()> {
        self.write_to(self.inner.record_type.name(), ids, attribute, value)
    }

    /// Write an attribute of any registered record type.
    ///
    /// Stored attributes go to the store in one call; computed ones go
    /// through their own setter.
    pub fn write_to(
        &self,
        record_type: &str,
        ids: &[RecordId],
        attribute: &str,
        value: &Value,
    ) -> Result<()> {
        let target = self.inner.registry.get(record_type)?;
        match &target.attribute(attribute)?.kind {
            AttributeKind::Stored { .. } => self.inner.store.write_attribute(
                &self.inner.access,
                record_type,
                ids,
                attribute,
                value,
            ),
            AttributeKind::Computed(_) => {
                ComputedResolver::new(self.inner.registry, self.inner.store).set(
                    &self.inner.access,
                    record_type,
                    ids,
                    attribute,
                    value.clone(),
                )
            }
        }
    }
}

impl<'a> Deref for SetterContext<'a> {
    type Target = ComputeContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
