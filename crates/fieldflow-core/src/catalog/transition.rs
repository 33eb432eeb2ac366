//! Transition tables.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Legal `(from, to)` state pairs of a record type.
///
/// A state is admissible for a target exactly when the pair is in the table;
/// there is no separate list of states. A record already in the target state
/// is admissible only through an explicit self-loop.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable {
    edges: BTreeSet<(String, String)>,
}

impl TransitionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a legal transition.
    pub fn with(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.insert((from.into(), to.into()));
        self
    }

    /// Check whether `from` may move to `to`.
    pub fn allows(&self, from: &str, to: &str) -> bool {
        // BTreeSet<(String, String)> cannot be probed with borrowed tuples.
        self.edges.iter().any(|(f, t)| f == from && t == to)
    }

    /// States that may move to `to`, in sorted order.
    pub fn sources(&self, to: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, t)| t == to)
            .map(|(f, _)| f.as_str())
            .collect()
    }

    /// Every state that appears in the table.
    pub fn states(&self) -> BTreeSet<&str> {
        self.edges
            .iter()
            .flat_map(|(f, t)| [f.as_str(), t.as_str()])
            .collect()
    }

    /// Iterate over `(from, to)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(f, t)| (f.as_str(), t.as_str()))
    }

    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl<F, T> FromIterator<(F, T)> for TransitionTable
where
    F: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (F, T)>>(iter: I) -> Self {
        Self {
            edges: iter
                .into_iter()
                .map(|(f, t)| (f.into(), t.into()))
                .collect(),
        }
    }
}
