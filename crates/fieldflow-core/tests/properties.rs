use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use fieldflow_core::catalog::{AttributeDef, ComputedDef, FieldType, RecordTypeDef, TransitionTable};
use fieldflow_core::proto::Value;
use fieldflow_core::{
    AccessContext, ComputedResolver, Error, FunctionTable, MemoryStore, NamedValueMap,
    RecordStore, Registry, TransitionGuard, ValueMap,
};

const STATES: [&str; 4] = ["draft", "confirmed", "done", "cancelled"];

fn workflow_table() -> TransitionTable {
    TransitionTable::new()
        .with("draft", "confirmed")
        .with("draft", "cancelled")
        .with("confirmed", "done")
        .with("confirmed", "cancelled")
        .with("done", "done")
}

/// Registry with a sparse getter (skips ids divisible by 3, adds id 0) and a
/// names-list getter counting its calls.
fn metrics_registry(calls: Arc<AtomicUsize>) -> Registry {
    let def = RecordTypeDef::new("metric")
        .with_attribute(AttributeDef::computed(
            "sparse",
            ComputedDef::new(FieldType::Integer, "get_sparse"),
        ))
        .with_attributes(["min", "max", "avg"].map(|name| {
            AttributeDef::computed(name, ComputedDef::new(FieldType::Float, "get_stats").names_list())
        }));
    let functions = FunctionTable::new()
        .batch_getter("get_sparse", |_, batch, _| {
            let mut values: ValueMap = batch
                .iter()
                .filter(|h| h.id() % 3 != 0)
                .map(|h| (h.id(), Value::Int(h.id() as i64)))
                .collect();
            values.insert(0, Value::Int(-1));
            Ok(values)
        })
        .names_getter("get_stats", move |_, batch, names| {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut result = NamedValueMap::new();
            for name in names {
                result.insert(
                    name.clone(),
                    batch.iter().map(|h| (h.id(), Value::Float(1.0))).collect(),
                );
            }
            Ok(result)
        });

    let mut registry = Registry::default();
    registry.register(def, functions).unwrap();
    registry
}

proptest! {
    #[test]
    fn get_returns_exactly_requested_ids(ids in prop::collection::btree_set(1u64..200, 1..40)) {
        let registry = metrics_registry(Arc::new(AtomicUsize::new(0)));
        let store = MemoryStore::default();
        let ids: Vec<u64> = ids.into_iter().collect();

        let values = ComputedResolver::new(&registry, &store)
            .get(&AccessContext::default(), "metric", &ids, "sparse")
            .unwrap();

        let keys: BTreeSet<u64> = values.keys().copied().collect();
        prop_assert_eq!(keys, ids.iter().copied().collect::<BTreeSet<_>>());
        for id in &ids {
            let expected = if id % 3 == 0 { Value::Null } else { Value::Int(*id as i64) };
            prop_assert_eq!(&values[id], &expected);
        }
    }

    #[test]
    fn names_list_getter_runs_once(
        ids in prop::collection::vec(1u64..100, 1..20),
        names in prop::sample::subsequence(vec!["min", "max", "avg"], 1..=3),
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = metrics_registry(Arc::clone(&calls));
        let store = MemoryStore::default();
        let names: Vec<String> = names.into_iter().map(String::from).collect();

        let values = ComputedResolver::new(&registry, &store)
            .get_many(&AccessContext::default(), "metric", &ids, &names)
            .unwrap();

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert_eq!(values.len(), names.len());
    }

    #[test]
    fn read_only_attribute_rejects_every_write(
        ids in prop::collection::vec(any::<u64>(), 0..10),
        value in any::<i64>(),
    ) {
        let registry = metrics_registry(Arc::new(AtomicUsize::new(0)));
        let store = MemoryStore::default();

        let err = ComputedResolver::new(&registry, &store)
            .set(&AccessContext::default(), "metric", &ids, "sparse", Value::Int(value))
            .unwrap_err();
        prop_assert!(matches!(err, Error::ReadOnlyAttribute { .. }), "unexpected error: {}", err);
        prop_assert!(store.writes().is_empty());
    }

    #[test]
    fn guard_admits_exactly_legal_transitions(
        states in prop::collection::vec(prop::option::of(prop::sample::select(STATES.to_vec())), 0..16),
        target in prop::sample::select(STATES.to_vec()),
    ) {
        let mut registry = Registry::default();
        let order = registry
            .register(
                RecordTypeDef::new("order")
                    .with_attribute(AttributeDef::stored("state", FieldType::selection(STATES)))
                    .with_transitions(workflow_table()),
                FunctionTable::new(),
            )
            .unwrap();
        let table = workflow_table();

        let store = MemoryStore::default();
        let ids: Vec<u64> = (1..=states.len() as u64).collect();
        for (id, state) in ids.iter().zip(&states) {
            let value = state.map(Value::from).unwrap_or(Value::Null);
            store.insert("order", *id, [("state", value)]);
        }
        let batch = store.browse("order", &ids);

        let report = TransitionGuard::new(&store, &order)
            .run_with_report(&AccessContext::default(), target, &batch, |subset| Ok(subset.ids()))
            .unwrap();

        let expected: Vec<u64> = ids
            .iter()
            .zip(&states)
            .filter(|(_, s)| s.map_or(false, |s| table.allows(s, target)))
            .map(|(id, _)| *id)
            .collect();
        let moved: Vec<u64> = ids
            .iter()
            .zip(&states)
            .filter(|(id, s)| expected.contains(id) && *s != &Some(target))
            .map(|(id, _)| *id)
            .collect();

        prop_assert_eq!(&report.result, &expected);
        prop_assert_eq!(&report.filtered, &expected);
        prop_assert_eq!(&report.written, &moved);
        prop_assert_eq!(store.writes().len(), usize::from(!moved.is_empty()));
        for id in &moved {
            prop_assert_eq!(store.peek("order", *id, "state"), Value::from(target));
        }
    }
}
