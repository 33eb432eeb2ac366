//! Core error types.

use fieldflow_proto::RecordId;
use thiserror::Error;

/// Result type for fieldflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the resolver, the transition guard, the registry and
/// record stores.
///
/// Errors returned by getters, setters, search functions and guarded
/// operations are passed through untouched.
#[derive(Debug, Error)]
pub enum Error {
    /// A getter name does not resolve to a getter of the declared shape.
    #[error("getter '{getter}' for {record_type}.{attribute} does not resolve: {reason}")]
    GetterResolution {
        record_type: String,
        attribute: String,
        getter: String,
        reason: String,
    },

    /// A setter name does not resolve to a setter.
    #[error("setter '{setter}' for {record_type}.{attribute} does not resolve")]
    SetterResolution {
        record_type: String,
        attribute: String,
        setter: String,
    },

    /// A search function name does not resolve.
    #[error("search function '{searcher}' for {record_type}.{attribute} does not resolve")]
    SearcherResolution {
        record_type: String,
        attribute: String,
        searcher: String,
    },

    /// Malformed attribute or record type declaration.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Record type registered twice.
    #[error("record type '{0}' is already registered")]
    DuplicateRecordType(String),

    /// Record type not registered.
    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    /// Attribute not declared on the record type.
    #[error("unknown attribute: {record_type}.{attribute}")]
    UnknownAttribute {
        record_type: String,
        attribute: String,
    },

    /// Write attempted on a computed attribute without a setter.
    #[error("attribute {record_type}.{attribute} is read-only")]
    ReadOnlyAttribute {
        record_type: String,
        attribute: String,
    },

    /// Computed-attribute operation requested on a stored attribute.
    #[error("attribute {record_type}.{attribute} is stored, not computed")]
    AttributeNotComputed {
        record_type: String,
        attribute: String,
    },

    /// Search predicate on a computed attribute without a search function.
    #[error("attribute {record_type}.{attribute} cannot be searched")]
    UnsearchableAttribute {
        record_type: String,
        attribute: String,
    },

    /// Getter left out requested records.
    #[error("getter for {record_type}.{attribute} returned no value for records {missing:?}")]
    IncompleteGetterResult {
        record_type: String,
        attribute: String,
        missing: Vec<RecordId>,
    },

    /// Strict guard found records that cannot reach the target state.
    #[error("records {ids:?} of {record_type} cannot transition to '{target}'")]
    InadmissibleTransition {
        record_type: String,
        target: String,
        ids: Vec<RecordId>,
    },

    /// Records of one type handed to an operation bound to another.
    #[error("expected records of {expected}, got {found}")]
    RecordTypeMismatch { expected: String, found: String },

    /// Access denied by the record store.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Record store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Predicate construction failed.
    #[error("predicate error: {0}")]
    Predicate(#[from] fieldflow_proto::Error),

    /// Declaration (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Error raised by business code inside a getter, setter or guarded
    /// operation.
    #[error(transparent)]
    Callback(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Defects in record type declarations; these should abort setup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::GetterResolution { .. }
                | Error::SetterResolution { .. }
                | Error::SearcherResolution { .. }
                | Error::InvalidDescriptor(_)
                | Error::DuplicateRecordType(_)
        )
    }

    /// Expected, caller-facing errors.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::ReadOnlyAttribute { .. }
                | Error::AttributeNotComputed { .. }
                | Error::UnsearchableAttribute { .. }
                | Error::UnknownAttribute { .. }
                | Error::UnknownRecordType(_)
                | Error::RecordTypeMismatch { .. }
        )
    }

    /// Wrap a business error.
    pub fn callback<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Callback(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
