//! Computed attributes.
//!
//! A computed attribute has no storage of its own. Reads call its getter,
//! writes call its setter and searches are rewritten by its search function
//! into clauses over stored attributes.

mod context;
mod functions;
mod reader;
mod resolver;

pub use context::{ComputeContext, SetterContext};
pub use functions::{FunctionTable, Getter, NamedValueMap, Searcher, Setter, ValueMap};
pub use reader::AttributeReader;
pub use resolver::ComputedResolver;
