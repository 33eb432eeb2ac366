//! Workflow state transitions.
//!
//! A [`TransitionGuard`] wraps an operation on a batch of records: only the
//! records whose current state may move to the target are handed to the
//! operation, and only those are moved afterwards.

mod guard;

pub use guard::{TransitionGuard, TransitionReport};
