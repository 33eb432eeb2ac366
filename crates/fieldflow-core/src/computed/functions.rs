//! Functions backing computed attributes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::context::{ComputeContext, SetterContext};
use crate::catalog::{BatchSupport, InvocationStyle};
use crate::error::Result;
use crate::store::{RecordBatch, RecordHandle};
use fieldflow_proto::{Domain, RecordId, SearchClause, Value};

/// Values of one attribute keyed by record.
pub type ValueMap = HashMap<RecordId, Value>;

/// Values of several attributes keyed by attribute name.
pub type NamedValueMap = HashMap<String, ValueMap>;

type BatchFn = dyn Fn(&ComputeContext<'_>, &RecordBatch, &str) -> Result<ValueMap> + Send + Sync;
type NamesFn =
    dyn Fn(&ComputeContext<'_>, &RecordBatch, &[String]) -> Result<NamedValueMap> + Send + Sync;
type RecordFn = dyn Fn(&ComputeContext<'_>, &RecordHandle, &str) -> Result<Value> + Send + Sync;
type SetterFn =
    dyn Fn(&SetterContext<'_>, &RecordBatch, &str, &Value) -> Result<()> + Send + Sync;
type SearcherFn = dyn Fn(&str, &SearchClause) -> Result<Domain> + Send + Sync;

/// A getter in one of the shapes a computed attribute can declare.
#[derive(Clone)]
pub enum Getter {
    /// Whole batch, one attribute name per call.
    Batch(Arc<BatchFn>),
    /// Whole batch, every requested name in one call.
    Names(Arc<NamesFn>),
    /// One record per call.
    PerRecord(Arc<RecordFn>),
}

impl Getter {
    /// Capability flags this getter satisfies.
    pub fn shape(&self) -> (BatchSupport, InvocationStyle) {
        match self {
            Getter::Batch(_) => (BatchSupport::None, InvocationStyle::PerBatch),
            Getter::Names(_) => (BatchSupport::NamesList, InvocationStyle::PerBatch),
            Getter::PerRecord(_) => (BatchSupport::None, InvocationStyle::PerRecord),
        }
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Getter::Batch(_) => "Batch",
            Getter::Names(_) => "Names",
            Getter::PerRecord(_) => "PerRecord",
        };
        write!(f, "Getter::{}", kind)
    }
}

/// Writes a value through to the stored attributes it derives from.
pub type Setter = Arc<SetterFn>;

/// Rewrites a search clause on a computed attribute into stored terms.
pub type Searcher = Arc<SearcherFn>;

/// Named getters, setters and search functions of one record type.
#[derive(Clone, Default)]
pub struct FunctionTable {
    getters: HashMap<String, Getter>,
    setters: HashMap<String, Setter>,
    searchers: HashMap<String, Searcher>,
}

impl FunctionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a getter called once per batch and attribute.
    pub fn batch_getter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ComputeContext<'_>, &RecordBatch, &str) -> Result<ValueMap> + Send + Sync + 'static,
    {
        self.getters.insert(name.into(), Getter::Batch(Arc::new(f)));
        self
    }

    /// Register a getter that receives the list of requested names.
    pub fn names_getter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ComputeContext<'_>, &RecordBatch, &[String]) -> Result<NamedValueMap>
            + Send
            + Sync
            + 'static,
    {
        self.getters.insert(name.into(), Getter::Names(Arc::new(f)));
        self
    }

    /// Register a getter called once per record.
    pub fn record_getter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ComputeContext<'_>, &RecordHandle, &str) -> Result<Value> + Send + Sync + 'static,
    {
        self.getters.insert(name.into(), Getter::PerRecord(Arc::new(f)));
        self
    }

    /// Register a setter.
    pub fn setter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SetterContext<'_>, &RecordBatch, &str, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.setters.insert(name.into(), Arc::new(f));
        self
    }

    /// Register a search function.
    pub fn searcher<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str, &SearchClause) -> Result<Domain> + Send + Sync + 'static,
    {
        self.searchers.insert(name.into(), Arc::new(f));
        self
    }

    /// Merge another table; its entries win on name clashes.
    pub fn extend(mut self, other: FunctionTable) -> Self {
        self.getters.extend(other.getters);
        self.setters.extend(other.setters);
        self.searchers.extend(other.searchers);
        self
    }

    /// Look up a getter.
    pub fn getter(&self, name: &str) -> Option<&Getter> {
        self.getters.get(name)
    }

    /// Look up a setter.
    pub fn get_setter(&self, name: &str) -> Option<&Setter> {
        self.setters.get(name)
    }

    /// Look up a search function.
    pub fn get_searcher(&self, name: &str) -> Option<&Searcher> {
        self.searchers.get(name)
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut getters: Vec<_> = self.getters.keys().collect();
        let mut setters: Vec<_> = self.setters.keys().collect();
        let mut searchers: Vec<_> = self.searchers.keys().collect();
        getters.sort();
        setters.sort();
        searchers.sort();
        f.debug_struct("FunctionTable")
            .field("getters", &getters)
            .field("setters", &setters)
            .field("searchers", &searchers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        let table = FunctionTable::new()
            .batch_getter("get_a", |_, _, _| Ok(ValueMap::new()))
            .names_getter("get_many", |_, _, _| Ok(NamedValueMap::new()))
            .record_getter("get_one", |_, _, _| Ok(Value::Null));

        assert_eq!(
            table.getter("get_a").unwrap().shape(),
            (BatchSupport::None, InvocationStyle::PerBatch)
        );
        assert_eq!(
            table.getter("get_many").unwrap().shape(),
            (BatchSupport::NamesList, InvocationStyle::PerBatch)
        );
        assert_eq!(
            table.getter("get_one").unwrap().shape(),
            (BatchSupport::None, InvocationStyle::PerRecord)
        );
        assert!(table.getter("missing").is_none());
    }

    #[test]
    fn test_extend_overrides() {
        let base = FunctionTable::new().searcher("search_name", |_, _| Ok(Domain::new()));
        let child = FunctionTable::new()
            .searcher("search_name", |name, clause| Ok(vec![clause.on(name)?]));
        let table = base.extend(child);

        let domain = table.get_searcher("search_name").unwrap()(
            "code",
            &SearchClause::new(fieldflow_proto::Operator::Eq, "A"),
        )
        .unwrap();
        assert_eq!(domain.len(), 1);
    }

    #[test]
    fn test_debug_lists_names() {
        let table = FunctionTable::new().setter("set_age", |_, _, _, _| Ok(()));
        let debug = format!("{:?}", table);
        assert!(debug.contains("set_age"));
    }
}
