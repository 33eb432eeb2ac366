//! Record type declarations.

use std::collections::HashSet;

use super::field::{AttributeDef, AttributeKind};
use super::transition::TransitionTable;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Data part of a record type: attributes and workflow.
///
/// Functions backing computed attributes are bound separately, see
/// [`FunctionTable`](crate::computed::FunctionTable).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordTypeDef {
    /// Record type name (unique within a registry).
    pub name: String,
    /// Attribute declarations.
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    /// State attribute; the registry default applies when unset.
    #[serde(default)]
    pub state_field: Option<String>,
    /// Legal state transitions.
    #[serde(default)]
    pub transitions: TransitionTable,
}

impl RecordTypeDef {
    /// Create an empty record type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a declaration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the declaration as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add several attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = AttributeDef>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Replace an attribute with the same name, or add it.
    ///
    /// Used when composing a type from a base declaration.
    pub fn override_attribute(mut self, attribute: AttributeDef) -> Self {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(slot) => *slot = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }

    /// Name the state attribute.
    pub fn with_state_field(mut self, name: impl Into<String>) -> Self {
        self.state_field = Some(name.into());
        self
    }

    /// Set the transition table.
    pub fn with_transitions(mut self, transitions: TransitionTable) -> Self {
        self.transitions = transitions;
        self
    }

    /// Get an attribute by name.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Stored attributes.
    pub fn stored_attributes(&self) -> impl Iterator<Item = &AttributeDef> {
        self.attributes
            .iter()
            .filter(|a| matches!(a.kind, AttributeKind::Stored { .. }))
    }

    /// Computed attributes.
    pub fn computed_attributes(&self) -> impl Iterator<Item = &AttributeDef> {
        self.attributes.iter().filter(|a| a.is_computed())
    }

    /// Check declaration-level invariants that need no function table.
    pub fn validate(&self, state_field: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidDescriptor("record type without a name".into()));
        }

        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            if !seen.insert(attribute.name.as_str()) {
                return Err(Error::InvalidDescriptor(format!(
                    "attribute '{}' declared twice on '{}'",
                    attribute.name, self.name
                )));
            }
            if let Some(computed) = attribute.as_computed() {
                computed.validate(&attribute.name)?;
            }
        }

        if !self.transitions.is_empty() {
            match self.get_attribute(state_field).map(|a| &a.kind) {
                None => {
                    return Err(Error::InvalidDescriptor(format!(
                        "'{}' declares transitions but has no '{}' attribute",
                        self.name, state_field
                    )))
                }
                Some(AttributeKind::Computed(_)) => {
                    return Err(Error::InvalidDescriptor(format!(
                        "state attribute '{}' of '{}' must be stored",
                        state_field, self.name
                    )))
                }
                Some(AttributeKind::Stored { .. }) => {}
            }
        }

        Ok(())
    }
}
