//! Guarded state transitions.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::catalog::{RecordType, Registry};
use crate::config::GuardConfig;
use crate::error::{Error, Result};
use crate::security::AccessContext;
use crate::store::{RecordBatch, RecordStore};
use fieldflow_proto::{RecordId, Value};

/// Outcome of a guarded transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionReport<T> {
    /// Value returned by the wrapped operation.
    pub result: T,
    /// Records the operation was invoked on, in input order.
    pub filtered: Vec<RecordId>,
    /// Records excluded because their state cannot move to the target.
    pub skipped: Vec<RecordId>,
    /// Records whose state was written to the target afterwards.
    pub written: Vec<RecordId>,
}

/// Filters a batch by the transition table of its record type, runs an
/// operation on what remains and then moves those records to the target
/// state.
///
/// Records the operation already moved are left alone, so the state is never
/// written twice.
pub struct TransitionGuard<'a> {
    store: &'a dyn RecordStore,
    record_type: &'a RecordType,
    config: GuardConfig,
}

impl<'a> TransitionGuard<'a> {
    /// Guard for one record type with the default (lenient) policy.
    pub fn new(store: &'a dyn RecordStore, record_type: &'a RecordType) -> Self {
        Self {
            store,
            record_type,
            config: GuardConfig::default(),
        }
    }

    /// Guard for a registered record type, configured from the registry.
    pub fn for_registry(
        registry: &Registry,
        store: &'a dyn RecordStore,
        record_type: &'a RecordType,
    ) -> Self {
        Self::new(store, record_type).with_config(registry.config().guard())
    }

    /// Override the guard configuration.
    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Fail on inadmissible records instead of skipping them.
    pub fn strict(self) -> Self {
        self.with_config(GuardConfig::strict())
    }

    /// Run `op` on the admissible records and move them to `target`.
    pub fn run<T, F>(&self, ctx: &AccessContext, target: &str, records: &RecordBatch, op: F) -> Result<T>
    where
        F: FnOnce(&RecordBatch) -> Result<T>,
    {
        Ok(self.run_with_report(ctx, target, records, op)?.result)
    }

    /// Like [`run`](Self::run), also reporting which records were skipped
    /// and which were written.
    #[instrument(
        level = "debug",
        skip_all,
        fields(record_type = %self.record_type.name(), target = %target, records = records.len())
    )]
    pub fn run_with_report<T, F>(
        &self,
        ctx: &AccessContext,
        target: &str,
        records: &RecordBatch,
        op: F,
    ) -> Result<TransitionReport<T>>
    where
        F: FnOnce(&RecordBatch) -> Result<T>,
    {
        if records.record_type() != self.record_type.name() {
            return Err(Error::RecordTypeMismatch {
                expected: self.record_type.name().to_string(),
                found: records.record_type().to_string(),
            });
        }

        let state_field = self.record_type.state_field();
        let transitions = self.record_type.transitions();

        let current = self.read_states(ctx, records)?;

        let mut to_update: HashMap<RecordId, String> = HashMap::new();
        let mut filtered = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        for handle in records {
            let id = handle.id();
            match current.get(&id).and_then(Value::as_str) {
                Some(state) if transitions.allows(state, target) => {
                    if state != target {
                        to_update.insert(id, state.to_string());
                    }
                    filtered.push(id);
                }
                _ => skipped.push(id),
            }
        }

        if !skipped.is_empty() {
            if self.config.strict {
                return Err(Error::InadmissibleTransition {
                    record_type: self.record_type.name().to_string(),
                    target: target.to_string(),
                    ids: skipped,
                });
            }
            debug!(skipped = ?skipped, "Skipping records that cannot reach the target state");
        }

        let admitted: HashSet<RecordId> = filtered.iter().copied().collect();
        let subset = records.select(&admitted);
        let result = op(&subset)?;

        let written = self.settle(ctx, target, &to_update, &filtered)?;
        subset.invalidate(state_field);

        Ok(TransitionReport {
            result,
            filtered,
            skipped,
            written,
        })
    }

    /// Re-read the staged records and write the target state to those the
    /// operation left where they were.
    fn settle(
        &self,
        ctx: &AccessContext,
        target: &str,
        to_update: &HashMap<RecordId, String>,
        order: &[RecordId],
    ) -> Result<Vec<RecordId>> {
        if to_update.is_empty() {
            return Ok(Vec::new());
        }
        let staged: Vec<RecordId> = order
            .iter()
            .copied()
            .filter(|id| to_update.contains_key(id))
            .collect();
        let after = self.store.read_attribute(
            ctx,
            self.record_type.name(),
            &staged,
            self.record_type.state_field(),
        )?;

        let remaining: Vec<RecordId> = staged
            .into_iter()
            .filter(|id| {
                let before = to_update.get(id).map(String::as_str);
                let now = after.get(id).and_then(Value::as_str);
                now == before
            })
            .collect();

        if remaining.len() != to_update.len() {
            debug!(
                moved = to_update.len() - remaining.len(),
                "Operation already changed the state of some records"
            );
        }
        if remaining.is_empty() {
            return Ok(remaining);
        }

        self.store.write_attribute(
            ctx,
            self.record_type.name(),
            &remaining,
            self.record_type.state_field(),
            &Value::String(target.to_string()),
        )?;
        Ok(remaining)
    }

    fn read_states(&self, ctx: &AccessContext, records: &RecordBatch) -> Result<HashMap<RecordId, Value>> {
        if records.is_empty() {
            return Ok(HashMap::new());
        }
        self.store.read_attribute(
            ctx,
            self.record_type.name(),
            &records.ids(),
            self.record_type.state_field(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttributeDef, FieldType, RecordTypeDef, TransitionTable};
    use crate::computed::FunctionTable;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn order_type(transitions: TransitionTable) -> Arc<RecordType> {
        let def = RecordTypeDef::new("order")
            .with_attribute(AttributeDef::stored(
                "state",
                FieldType::selection(["draft", "confirmed", "done", "cancelled"]),
            ))
            .with_transitions(transitions);
        Registry::default().register(def, FunctionTable::new()).unwrap()
    }

    fn store_with(states: &[(RecordId, Value)]) -> MemoryStore {
        let store = MemoryStore::default();
        for (id, state) in states {
            store.insert("order", *id, [("state", state.clone())]);
        }
        store
    }

    #[test]
    fn test_filters_and_writes_once() {
        let rtype = order_type(
            TransitionTable::new()
                .with("draft", "confirmed")
                .with("confirmed", "confirmed"),
        );
        let store = store_with(&[(1, "draft".into()), (2, "cancelled".into())]);
        let batch = store.browse("order", &[1, 2]);

        let report = TransitionGuard::new(&store, &rtype)
            .run_with_report(&AccessContext::default(), "confirmed", &batch, |subset| {
                Ok(subset.ids())
            })
            .unwrap();

        assert_eq!(report.result, vec![1]);
        assert_eq!(report.skipped, vec![2]);
        assert_eq!(report.written, vec![1]);
        assert_eq!(store.writes().len(), 1);
        assert_eq!(store.peek("order", 1, "state"), Value::from("confirmed"));
        assert_eq!(store.peek("order", 2, "state"), Value::from("cancelled"));
    }

    #[test]
    fn test_null_state_is_inadmissible() {
        let rtype = order_type(TransitionTable::new().with("draft", "done"));
        let store = store_with(&[(1, Value::Null), (2, Value::Int(3))]);
        let batch = store.browse("order", &[1, 2, 3]);

        let report = TransitionGuard::new(&store, &rtype)
            .run_with_report(&AccessContext::default(), "done", &batch, |subset| {
                Ok(subset.len())
            })
            .unwrap();
        assert_eq!(report.result, 0);
        assert_eq!(report.skipped, vec![1, 2, 3]);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_op_error_writes_nothing() {
        let rtype = order_type(TransitionTable::new().with("draft", "done"));
        let store = store_with(&[(1, "draft".into())]);
        let batch = store.browse("order", &[1]);

        let err = TransitionGuard::new(&store, &rtype)
            .run(&AccessContext::default(), "done", &batch, |_| -> Result<()> {
                Err(Error::Store("disk full".into()))
            })
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(store.writes().is_empty());
        assert_eq!(store.peek("order", 1, "state"), Value::from("draft"));
    }

    #[test]
    fn test_strict_fails_before_op() {
        let rtype = order_type(TransitionTable::new().with("draft", "done"));
        let store = store_with(&[(1, "draft".into()), (2, "cancelled".into())]);
        let batch = store.browse("order", &[1, 2]);

        let mut called = false;
        let err = TransitionGuard::new(&store, &rtype)
            .strict()
            .run(&AccessContext::default(), "done", &batch, |_| {
                called = true;
                Ok(())
            })
            .unwrap_err();
        match err {
            Error::InadmissibleTransition { ids, target, .. } => {
                assert_eq!(ids, vec![2]);
                assert_eq!(target, "done");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!called);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_batch_of_other_type_rejected() {
        let rtype = order_type(TransitionTable::new().with("draft", "done"));
        let store = store_with(&[(1, "draft".into())]);
        store.insert("invoice", 1, [("state", Value::from("draft"))]);
        let batch = store.browse("invoice", &[1]);

        let mut called = false;
        let err = TransitionGuard::new(&store, &rtype)
            .run(&AccessContext::default(), "done", &batch, |_| {
                called = true;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::RecordTypeMismatch { .. }));
        assert!(err.is_usage());
        assert!(!called);
        assert!(store.writes().is_empty());
        assert_eq!(store.peek("order", 1, "state"), Value::from("draft"));
        assert_eq!(store.peek("invoice", 1, "state"), Value::from("draft"));
    }

    #[test]
    fn test_state_cache_invalidated() {
        let rtype = order_type(TransitionTable::new().with("draft", "done"));
        let store = store_with(&[(1, "draft".into())]);
        let batch = store.browse("order", &[1]);
        batch.get(0).unwrap().cache_value("state", Value::from("draft"));

        TransitionGuard::new(&store, &rtype)
            .run(&AccessContext::default(), "done", &batch, |_| Ok(()))
            .unwrap();
        assert!(!batch.get(0).unwrap().is_cached("state"));
    }
}
