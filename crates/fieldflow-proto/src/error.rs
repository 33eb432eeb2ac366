//! Predicate construction errors.

use thiserror::Error;

use crate::value::RecordId;

/// Errors raised while building predicates from search clauses.
#[derive(Debug, Error)]
pub enum Error {
    /// Operator string not recognised.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// Operand does not fit the operator.
    #[error("invalid operand for '{operator}': {reason}")]
    InvalidOperand {
        /// Operator the operand was given to.
        operator: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Record id that does not fit a signed integer element.
    #[error("record id {0} is out of range for an integer value")]
    IdOutOfRange(RecordId),
}
