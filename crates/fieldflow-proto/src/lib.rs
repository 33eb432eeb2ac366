//! fieldflow protocol types.
//!
//! Data-only types shared between the resolver, the transition guard and the
//! record store that sits underneath them.
//!
//! # Modules
//!
//! - [`value`] - Runtime attribute values and record identifiers
//! - [`filter`] - Search predicates handed to the store
//! - [`error`] - Predicate construction errors
//!
//! # Serialization
//!
//! All types derive `rkyv::Archive` for zero-copy archiving and serde for
//! JSON. Archive with rkyv directly:
//!
//! ```ignore
//! use fieldflow_proto::Value;
//!
//! let value = Value::String("draft".into());
//! let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&value).unwrap();
//! ```

pub mod error;
pub mod filter;
pub mod value;

pub use error::Error;

pub use filter::{Domain, FilterExpr, Operator, SearchClause, SimpleFilter};
pub use value::{RecordId, Value};
