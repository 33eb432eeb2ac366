//! Attribute descriptors.

use std::fmt;
use std::str::FromStr;

use super::types::FieldType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One declared attribute of a record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name, unique within its record type.
    pub name: String,
    /// Stored or computed.
    #[serde(flatten)]
    pub kind: AttributeKind,
}

/// Whether an attribute is persisted or derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Read from and written to the record store.
    Stored {
        /// Value type.
        field_type: FieldType,
    },
    /// Produced by a getter.
    Computed(ComputedDef),
}

/// When a computed attribute is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingPolicy {
    /// Only when the attribute itself is read.
    #[default]
    Lazy,
    /// Together with the record's stored attributes.
    Eager,
}

impl FromStr for LoadingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lazy" => Ok(LoadingPolicy::Lazy),
            "eager" => Ok(LoadingPolicy::Eager),
            other => Err(Error::InvalidDescriptor(format!(
                "loading policy must be 'lazy' or 'eager', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for LoadingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadingPolicy::Lazy => write!(f, "lazy"),
            LoadingPolicy::Eager => write!(f, "eager"),
        }
    }
}

/// Whether a getter can compute several attributes in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSupport {
    /// One call per attribute name.
    #[default]
    None,
    /// One call receives the list of requested names.
    NamesList,
}

/// How a getter is applied to a batch of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStyle {
    /// One call for the whole batch.
    #[default]
    PerBatch,
    /// One call per record.
    PerRecord,
}

/// Declaration of a computed attribute.
///
/// Function names refer to entries in the record type's function table and
/// are checked when the type is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedDef {
    /// Type of the computed value.
    pub value_type: FieldType,
    /// Getter name.
    pub getter: String,
    /// Setter name; read-only when absent.
    #[serde(default)]
    pub setter: Option<String>,
    /// Search function name; unsearchable when absent.
    #[serde(default)]
    pub searcher: Option<String>,
    /// Loading policy.
    #[serde(default)]
    pub loading: LoadingPolicy,
    /// Getter batching capability.
    #[serde(default)]
    pub batch_support: BatchSupport,
    /// Getter invocation style.
    #[serde(default)]
    pub invocation: InvocationStyle,
}

impl ComputedDef {
    /// Create a lazy, read-only, per-batch computed attribute.
    pub fn new(value_type: FieldType, getter: impl Into<String>) -> Self {
        Self {
            value_type,
            getter: getter.into(),
            setter: None,
            searcher: None,
            loading: LoadingPolicy::Lazy,
            batch_support: BatchSupport::None,
            invocation: InvocationStyle::PerBatch,
        }
    }

    /// Replace the getter.
    pub fn with_getter(mut self, getter: impl Into<String>) -> Self {
        self.getter = getter.into();
        self
    }

    /// Set the setter.
    pub fn with_setter(mut self, setter: impl Into<String>) -> Self {
        self.setter = Some(setter.into());
        self
    }

    /// Set the search function.
    pub fn with_searcher(mut self, searcher: impl Into<String>) -> Self {
        self.searcher = Some(searcher.into());
        self
    }

    /// Load together with stored attributes.
    pub fn eager(mut self) -> Self {
        self.loading = LoadingPolicy::Eager;
        self
    }

    /// The getter accepts a list of names.
    pub fn names_list(mut self) -> Self {
        self.batch_support = BatchSupport::NamesList;
        self
    }

    /// The getter runs once per record.
    pub fn per_record(mut self) -> Self {
        self.invocation = InvocationStyle::PerRecord;
        self
    }

    /// Check if the attribute can be written.
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// Check if the attribute can be searched.
    pub fn is_searchable(&self) -> bool {
        self.searcher.is_some()
    }

    /// Check that the declared flags can be combined.
    pub fn validate(&self, attribute: &str) -> Result<()> {
        if self.getter.is_empty() {
            return Err(Error::InvalidDescriptor(format!(
                "computed attribute '{}' has an empty getter name",
                attribute
            )));
        }
        if self.batch_support == BatchSupport::NamesList
            && self.invocation == InvocationStyle::PerRecord
        {
            return Err(Error::InvalidDescriptor(format!(
                "computed attribute '{}' cannot take a names list per record",
                attribute
            )));
        }
        Ok(())
    }
}

impl AttributeDef {
    /// Create a stored attribute.
    pub fn stored(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Stored { field_type },
        }
    }

    /// Create a computed attribute.
    pub fn computed(name: impl Into<String>, computed: ComputedDef) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Computed(computed),
        }
    }

    /// Value type, stored or computed.
    pub fn field_type(&self) -> &FieldType {
        match &self.kind {
            AttributeKind::Stored { field_type } => field_type,
            AttributeKind::Computed(c) => &c.value_type,
        }
    }

    /// Check if this attribute is computed.
    pub fn is_computed(&self) -> bool {
        matches!(self.kind, AttributeKind::Computed(_))
    }

    /// Computed declaration, if any.
    pub fn as_computed(&self) -> Option<&ComputedDef> {
        match &self.kind {
            AttributeKind::Computed(c) => Some(c),
            AttributeKind::Stored { .. } => None,
        }
    }

    /// Copy under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: self.kind.clone(),
        }
    }

    /// Copy with one computed property overridden; the original is untouched.
    ///
    /// Fails with `InvalidDescriptor` on stored attributes.
    pub fn derive<F>(&self, f: F) -> Result<Self>
    where
        F: FnOnce(ComputedDef) -> ComputedDef,
    {
        match &self.kind {
            AttributeKind::Computed(c) => Ok(Self {
                name: self.name.clone(),
                kind: AttributeKind::Computed(f(c.clone())),
            }),
            AttributeKind::Stored { .. } => Err(Error::InvalidDescriptor(format!(
                "cannot derive a computed attribute from stored attribute '{}'",
                self.name
            ))),
        }
    }
}
