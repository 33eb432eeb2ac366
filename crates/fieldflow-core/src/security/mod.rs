//! Access control for fieldflow operations.
//!
//! Every store call carries an [`AccessContext`]. Callers pass their own
//! context; the resolver hands getters and setters an elevated copy.

pub mod context;

pub use context::{AccessContext, AccessMode};
