//! Computed-attribute resolution.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use super::context::{ComputeContext, SetterContext};
use super::functions::{Getter, NamedValueMap, ValueMap};
use crate::catalog::{AttributeKind, ComputedDef, RecordType, Registry};
use crate::config::MissingValuePolicy;
use crate::error::{Error, Result};
use crate::security::AccessContext;
use crate::store::RecordStore;
use fieldflow_proto::{Domain, RecordId, SearchClause, Value};

/// Evaluates, writes and searches computed attributes.
///
/// Getters and setters always run with an elevated copy of the caller's
/// context. Errors they return are passed through as-is.
pub struct ComputedResolver<'a> {
    registry: &'a Registry,
    store: &'a dyn RecordStore,
}

/// Requested names sharing one getter, in request order. Each name keeps
/// its own declaration.
struct GetterGroup<'r> {
    getter: &'r str,
    members: Vec<(String, &'r ComputedDef)>,
}

impl GetterGroup<'_> {
    fn names(&self) -> Vec<String> {
        self.members.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl<'a> ComputedResolver<'a> {
    /// Create a resolver over a registry and a store.
    pub fn new(registry: &'a Registry, store: &'a dyn RecordStore) -> Self {
        Self { registry, store }
    }

    /// Compute one attribute for a set of records.
    ///
    /// The result holds exactly the requested ids.
    pub fn get(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        attribute: &str,
    ) -> Result<ValueMap> {
        let mut values = self.get_many(ctx, record_type, ids, &[attribute.to_string()])?;
        Ok(values.remove(attribute).unwrap_or_default())
    }

    /// Compute several attributes for a set of records.
    ///
    /// Names that share a getter declaring [`BatchSupport::NamesList`]
    /// are computed in a single call; other getters run once per name.
    ///
    /// [`BatchSupport::NamesList`]: crate::catalog::BatchSupport::NamesList
    #[instrument(level = "debug", skip(self, ctx, ids), fields(records = ids.len()))]
    pub fn get_many(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        names: &[String],
    ) -> Result<NamedValueMap> {
        let rtype = self.registry.get(record_type)?;
        let groups = group_by_getter(&rtype, names)?;

        let batch = self.store.browse(record_type, ids);
        if batch.is_empty() {
            return Ok(names.iter().map(|n| (n.clone(), ValueMap::new())).collect());
        }
        let requested: HashSet<RecordId> = batch.ids().into_iter().collect();

        let compute = ComputeContext::new(self.registry, self.store, &rtype, ctx.elevated());
        let mut result = NamedValueMap::with_capacity(names.len());

        for group in &groups {
            let (first, first_def) = &group.members[0];
            let getter = rtype.resolve_getter(first, first_def)?;
            match getter {
                Getter::Names(f) => {
                    let names = group.names();
                    debug!(getter = %group.getter, names = ?names, "Calling names getter");
                    let mut computed = f(&compute, &batch, names.as_slice())?;
                    for (name, def) in &group.members {
                        let values = computed.remove(name).unwrap_or_default();
                        let values = self.complete(&rtype, name, def, values, &requested)?;
                        result.insert(name.clone(), values);
                    }
                }
                Getter::Batch(f) => {
                    for (name, def) in &group.members {
                        debug!(getter = %group.getter, name = %name, "Calling batch getter");
                        let values = f(&compute, &batch, name.as_str())?;
                        let values = self.complete(&rtype, name, def, values, &requested)?;
                        result.insert(name.clone(), values);
                    }
                }
                Getter::PerRecord(f) => {
                    for (name, def) in &group.members {
                        debug!(getter = %group.getter, name = %name, "Calling record getter");
                        let mut values = ValueMap::with_capacity(batch.len());
                        for handle in &batch {
                            values.insert(handle.id(), f(&compute, handle.as_ref(), name.as_str())?);
                        }
                        let values = self.complete(&rtype, name, def, values, &requested)?;
                        result.insert(name.clone(), values);
                    }
                }
            }
        }

        Ok(result)
    }

    /// Write one value to a computed attribute on a set of records.
    pub fn set(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        ids: &[RecordId],
        attribute: &str,
        value: Value,
    ) -> Result<()> {
        self.set_many(ctx, record_type, attribute, vec![(ids.to_vec(), value)])
    }

    /// Write different values to different groups of records.
    ///
    /// The setter runs once per `(ids, value)` pair, in order. Empty groups
    /// are skipped. Persisting is up to the setter.
    #[instrument(level = "debug", skip(self, ctx, assignments), fields(groups = assignments.len()))]
    pub fn set_many(
        &self,
        ctx: &AccessContext,
        record_type: &str,
        attribute: &str,
        assignments: Vec<(Vec<RecordId>, Value)>,
    ) -> Result<()> {
        let rtype = self.registry.get(record_type)?;
        let setter = rtype.resolve_setter(attribute)?;

        let setter_ctx = SetterContext::new(ComputeContext::new(
            self.registry,
            self.store,
            &rtype,
            ctx.elevated(),
        ));

        for (ids, value) in &assignments {
            let batch = self.store.browse(record_type, ids);
            if batch.is_empty() {
                continue;
            }
            debug!(records = batch.len(), "Calling setter");
            setter(&setter_ctx, &batch, attribute, value)?;
        }
        Ok(())
    }

    /// Rewrite a search clause on one attribute into a domain over stored
    /// attributes.
    ///
    /// Stored attributes translate to the direct comparison; computed ones go
    /// through their search function.
    #[instrument(level = "debug", skip(self, clause))]
    pub fn translate_search(
        &self,
        record_type: &str,
        attribute: &str,
        clause: &SearchClause,
    ) -> Result<Domain> {
        let rtype = self.registry.get(record_type)?;
        match &rtype.attribute(attribute)?.kind {
            AttributeKind::Stored { .. } => Ok(vec![clause.on(attribute)?]),
            AttributeKind::Computed(_) => {
                let searcher = rtype.resolve_searcher(attribute)?;
                searcher(attribute, clause)
            }
        }
    }

    /// Translate a list of clauses (combined with AND) in one pass.
    pub fn translate_domain(
        &self,
        record_type: &str,
        clauses: &[(String, SearchClause)],
    ) -> Result<Domain> {
        let mut domain = Domain::new();
        for (attribute, clause) in clauses {
            domain.extend(self.translate_search(record_type, attribute, clause)?);
        }
        Ok(domain)
    }

    /// Restrict a getter result to the requested ids and fill the gaps.
    fn complete(
        &self,
        rtype: &RecordType,
        attribute: &str,
        computed: &ComputedDef,
        mut values: ValueMap,
        requested: &HashSet<RecordId>,
    ) -> Result<ValueMap> {
        let before = values.len();
        values.retain(|id, _| requested.contains(id));
        if values.len() != before {
            debug!(
                attribute,
                dropped = before - values.len(),
                "Getter returned values for records that were not requested"
            );
        }

        let mut missing: Vec<RecordId> = requested
            .iter()
            .filter(|id| !values.contains_key(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            match self.registry.config().missing_values {
                MissingValuePolicy::FillNull => {
                    warn!(
                        record_type = rtype.name(),
                        attribute,
                        missing = ?missing,
                        "Getter left records without a value"
                    );
                    for id in missing {
                        values.insert(id, Value::Null);
                    }
                }
                MissingValuePolicy::Error => {
                    return Err(Error::IncompleteGetterResult {
                        record_type: rtype.name().to_string(),
                        attribute: attribute.to_string(),
                        missing,
                    });
                }
            }
        }

        if let Some((id, value)) = values
            .iter()
            .find(|(_, v)| !computed.value_type.accepts(v))
        {
            warn!(
                record_type = rtype.name(),
                attribute,
                record = id,
                value = ?value,
                "Getter returned a value outside the declared type"
            );
        }

        Ok(values)
    }
}

/// Resolve every requested name and group names by getter, keeping the order
/// in which getters were first requested. Fails before any getter runs.
fn group_by_getter<'r>(rtype: &'r RecordType, names: &[String]) -> Result<Vec<GetterGroup<'r>>> {
    let mut groups: Vec<GetterGroup<'r>> = Vec::new();
    for name in names {
        let computed = rtype.computed(name)?;
        rtype.resolve_getter(name, computed)?;
        match groups.iter_mut().find(|g| g.getter == computed.getter) {
            Some(group) if !group.members.iter().any(|(n, _)| n == name) => {
                group.members.push((name.clone(), computed))
            }
            Some(_) => {}
            None => groups.push(GetterGroup {
                getter: computed.getter.as_str(),
                members: vec![(name.clone(), computed)],
            }),
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttributeDef, FieldType, RecordTypeDef};
    use crate::computed::FunctionTable;
    use crate::config::CoreConfig;
    use crate::store::MemoryStore;
    use fieldflow_proto::Operator;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn registry_with(def: RecordTypeDef, functions: FunctionTable) -> Registry {
        let mut registry = Registry::default();
        registry.register(def, functions).unwrap();
        registry
    }

    #[test]
    fn test_get_fills_all_ids() {
        let registry = registry_with(
            RecordTypeDef::new("party").with_attribute(AttributeDef::computed(
                "qr",
                ComputedDef::new(FieldType::Binary, "make_qrcode"),
            )),
            FunctionTable::new().batch_getter("make_qrcode", |_, batch, _| {
                Ok(batch
                    .iter()
                    .filter(|h| h.id() != 3)
                    .map(|h| (h.id(), Value::Bytes(vec![h.id() as u8])))
                    .chain([(99, Value::Bytes(vec![99]))])
                    .collect())
            }),
        );
        let store = MemoryStore::default();
        let resolver = ComputedResolver::new(&registry, &store);

        let values = resolver
            .get(&AccessContext::default(), "party", &[1, 2, 3], "qr")
            .unwrap();
        let mut keys: Vec<_> = values.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2, 3]);
        assert_eq!(values[&3], Value::Null);
        assert_eq!(values[&1], Value::Bytes(vec![1]));
    }

    #[test]
    fn test_shared_getter_keeps_each_type() {
        let registry = registry_with(
            RecordTypeDef::new("party")
                .with_attribute(AttributeDef::computed(
                    "rank",
                    ComputedDef::new(FieldType::Integer, "get_info"),
                ))
                .with_attribute(AttributeDef::computed(
                    "label",
                    ComputedDef::new(FieldType::Char, "get_info"),
                )),
            FunctionTable::new().batch_getter("get_info", |_, batch, name| {
                Ok(batch
                    .iter()
                    .map(|h| {
                        let value = match name {
                            "rank" => Value::Int(h.id() as i64),
                            _ => Value::String(format!("P{}", h.id())),
                        };
                        (h.id(), value)
                    })
                    .collect())
            }),
        );
        let rtype = registry.get("party").unwrap();
        let names = vec!["rank".to_string(), "label".to_string()];

        let groups = group_by_getter(&rtype, &names).unwrap();
        assert_eq!(groups.len(), 1);
        let types: Vec<_> = groups[0]
            .members
            .iter()
            .map(|(name, def)| (name.as_str(), def.value_type.clone()))
            .collect();
        assert_eq!(
            types,
            vec![("rank", FieldType::Integer), ("label", FieldType::Char)]
        );

        let store = MemoryStore::default();
        let values = ComputedResolver::new(&registry, &store)
            .get_many(&AccessContext::default(), "party", &[4], &names)
            .unwrap();
        assert_eq!(values["rank"][&4], Value::Int(4));
        assert_eq!(values["label"][&4], Value::String("P4".into()));
    }

    #[test]
    fn test_missing_values_error_policy() {
        let mut registry =
            Registry::new(CoreConfig::default().missing_values(MissingValuePolicy::Error));
        registry
            .register(
                RecordTypeDef::new("party").with_attribute(AttributeDef::computed(
                    "rank",
                    ComputedDef::new(FieldType::Integer, "get_rank"),
                )),
                FunctionTable::new().batch_getter("get_rank", |_, _, _| Ok(ValueMap::new())),
            )
            .unwrap();
        let store = MemoryStore::default();

        let err = ComputedResolver::new(&registry, &store)
            .get(&AccessContext::default(), "party", &[4, 2], "rank")
            .unwrap_err();
        match err {
            Error::IncompleteGetterResult { missing, .. } => assert_eq!(missing, vec![2, 4]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_ids_skip_getter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = registry_with(
            RecordTypeDef::new("party").with_attribute(AttributeDef::computed(
                "rank",
                ComputedDef::new(FieldType::Integer, "get_rank"),
            )),
            FunctionTable::new().batch_getter("get_rank", move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ValueMap::new())
            }),
        );
        let store = MemoryStore::default();

        let values = ComputedResolver::new(&registry, &store)
            .get(&AccessContext::default(), "party", &[], "rank")
            .unwrap();
        assert!(values.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stored_attribute_is_not_computed() {
        let registry = registry_with(
            RecordTypeDef::new("party").with_attribute(AttributeDef::stored("name", FieldType::Char)),
            FunctionTable::new(),
        );
        let store = MemoryStore::default();
        let resolver = ComputedResolver::new(&registry, &store);

        let err = resolver
            .get(&AccessContext::default(), "party", &[1], "name")
            .unwrap_err();
        assert!(matches!(err, Error::AttributeNotComputed { .. }));
        assert!(err.is_usage());

        let err = resolver
            .set(&AccessContext::default(), "party", &[1], "name", Value::from("x"))
            .unwrap_err();
        assert!(matches!(err, Error::AttributeNotComputed { .. }));
    }

    #[test]
    fn test_translate_stored_and_computed() {
        let registry = registry_with(
            RecordTypeDef::new("party")
                .with_attribute(AttributeDef::stored("code", FieldType::Char))
                .with_attribute(AttributeDef::computed(
                    "full_code",
                    ComputedDef::new(FieldType::Char, "get_full_code")
                        .with_searcher("search_full_code"),
                ))
                .with_attribute(AttributeDef::computed(
                    "qr",
                    ComputedDef::new(FieldType::Binary, "get_full_code"),
                )),
            FunctionTable::new()
                .batch_getter("get_full_code", |_, _, _| Ok(ValueMap::new()))
                .searcher("search_full_code", |_, clause| Ok(vec![clause.on("code")?])),
        );
        let store = MemoryStore::default();
        let resolver = ComputedResolver::new(&registry, &store);

        let clause = SearchClause::new(Operator::ILike, "%A%");
        let domain = resolver.translate_search("party", "full_code", &clause).unwrap();
        assert_eq!(domain[0].fields(), vec!["code"]);

        let domain = resolver
            .translate_domain(
                "party",
                &[
                    ("code".into(), SearchClause::new(Operator::Eq, "X")),
                    ("full_code".into(), clause.clone()),
                ],
            )
            .unwrap();
        assert_eq!(domain.len(), 2);

        let err = resolver.translate_search("party", "qr", &clause).unwrap_err();
        assert!(matches!(err, Error::UnsearchableAttribute { .. }));
    }
}
