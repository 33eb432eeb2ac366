//! Registry of record types.
//!
//! Type setup happens here, once, before any resolver or guard call. A
//! registered type is frozen behind an `Arc` and never changes afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use super::entity::RecordTypeDef;
use super::field::{AttributeDef, AttributeKind, ComputedDef};
use super::transition::TransitionTable;
use crate::computed::{FunctionTable, Getter, Searcher, Setter};
use crate::config::CoreConfig;
use crate::error::{Error, Result};

/// A registered record type: declaration plus bound functions.
#[derive(Debug)]
pub struct RecordType {
    def: RecordTypeDef,
    functions: FunctionTable,
    state_field: String,
}

impl RecordType {
    /// Record type name.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Declaration this type was registered from.
    pub fn def(&self) -> &RecordTypeDef {
        &self.def
    }

    /// Bound functions.
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Name of the workflow state attribute.
    pub fn state_field(&self) -> &str {
        &self.state_field
    }

    /// Legal state transitions.
    pub fn transitions(&self) -> &TransitionTable {
        &self.def.transitions
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Result<&AttributeDef> {
        self.def
            .get_attribute(name)
            .ok_or_else(|| Error::UnknownAttribute {
                record_type: self.def.name.clone(),
                attribute: name.to_string(),
            })
    }

    /// Look up a computed attribute.
    pub fn computed(&self, name: &str) -> Result<&ComputedDef> {
        match &self.attribute(name)?.kind {
            AttributeKind::Computed(c) => Ok(c),
            AttributeKind::Stored { .. } => Err(Error::AttributeNotComputed {
                record_type: self.def.name.clone(),
                attribute: name.to_string(),
            }),
        }
    }

    /// Resolve the getter of a computed attribute and check its shape.
    pub fn resolve_getter(&self, attribute: &str, computed: &ComputedDef) -> Result<&Getter> {
        let resolution_error = |reason: String| Error::GetterResolution {
            record_type: self.def.name.clone(),
            attribute: attribute.to_string(),
            getter: computed.getter.clone(),
            reason,
        };

        let getter = self
            .functions
            .getter(&computed.getter)
            .ok_or_else(|| resolution_error("no getter with that name".to_string()))?;

        let declared = (computed.batch_support, computed.invocation);
        if getter.shape() != declared {
            return Err(resolution_error(format!(
                "declared {:?} but bound getter is {:?}",
                declared,
                getter.shape()
            )));
        }
        Ok(getter)
    }

    /// Resolve the setter of a computed attribute.
    pub fn resolve_setter(&self, attribute: &str) -> Result<&Setter> {
        let computed = self.computed(attribute)?;
        let name = computed
            .setter
            .as_deref()
            .ok_or_else(|| Error::ReadOnlyAttribute {
                record_type: self.def.name.clone(),
                attribute: attribute.to_string(),
            })?;
        self.functions
            .get_setter(name)
            .ok_or_else(|| Error::SetterResolution {
                record_type: self.def.name.clone(),
                attribute: attribute.to_string(),
                setter: name.to_string(),
            })
    }

    /// Resolve the search function of a computed attribute.
    pub fn resolve_searcher(&self, attribute: &str) -> Result<&Searcher> {
        let computed = self.computed(attribute)?;
        let name = computed
            .searcher
            .as_deref()
            .ok_or_else(|| Error::UnsearchableAttribute {
                record_type: self.def.name.clone(),
                attribute: attribute.to_string(),
            })?;
        self.functions
            .get_searcher(name)
            .ok_or_else(|| Error::SearcherResolution {
                record_type: self.def.name.clone(),
                attribute: attribute.to_string(),
                searcher: name.to_string(),
            })
    }

    fn validate_functions(&self) -> Result<()> {
        for attribute in self.def.computed_attributes() {
            let Some(computed) = attribute.as_computed() else {
                continue;
            };
            self.resolve_getter(&attribute.name, computed)?;
            if computed.setter.is_some() {
                self.resolve_setter(&attribute.name)?;
            }
            if computed.searcher.is_some() {
                self.resolve_searcher(&attribute.name)?;
            }
        }
        Ok(())
    }
}

/// The set of record types known to a resolver or guard.
#[derive(Debug, Default)]
pub struct Registry {
    config: CoreConfig,
    types: HashMap<String, Arc<RecordType>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            types: HashMap::new(),
        }
    }

    /// Configuration shared by all types.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Validate and register a record type.
    ///
    /// Fails on duplicate type or attribute names, malformed computed
    /// declarations, unresolved or mis-shaped functions, and transition
    /// tables without a state attribute.
    #[instrument(level = "debug", skip_all, fields(record_type = %def.name))]
    pub fn register(&mut self, def: RecordTypeDef, functions: FunctionTable) -> Result<Arc<RecordType>> {
        if self.types.contains_key(&def.name) {
            return Err(Error::DuplicateRecordType(def.name));
        }

        let state_field = def
            .state_field
            .clone()
            .unwrap_or_else(|| self.config.default_state_field.clone());
        def.validate(&state_field)?;

        let record_type = RecordType {
            def,
            functions,
            state_field,
        };
        record_type.validate_functions()?;

        debug!(
            attributes = record_type.def.attributes.len(),
            computed = record_type.def.computed_attributes().count(),
            transitions = record_type.transitions().len(),
            "Registered record type"
        );

        let record_type = Arc::new(record_type);
        self.types
            .insert(record_type.name().to_string(), Arc::clone(&record_type));
        Ok(record_type)
    }

    /// Get a registered record type.
    pub fn get(&self, name: &str) -> Result<Arc<RecordType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownRecordType(name.to_string()))
    }

    /// Check if a record type is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
