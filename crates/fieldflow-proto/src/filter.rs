//! Search predicates.
//!
//! A search over a record type is a list of [`FilterExpr`]s that must all
//! hold (a domain). Field names are stored attribute names; a dotted path such
//! as `"party.name"` refers to an attribute of a related record type and is
//! left to the store to join.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::value::Value;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A domain: filter expressions combined with AND.
pub type Domain = Vec<FilterExpr>;

/// Comparison operators accepted in search clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `like` (case sensitive)
    Like,
    /// `ilike` (case insensitive)
    ILike,
    /// `not like`
    NotLike,
}

impl Operator {
    /// The textual form used in search clauses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::NotLike => "not like",
        }
    }

    /// Build the predicate `field <op> value` over a stored attribute.
    ///
    /// `=`/`!=` against null become `IS NULL`/`IS NOT NULL`. `in`/`not in`
    /// expand list values into their elements. Pattern operators require a
    /// string operand.
    pub fn apply(self, field: impl Into<String>, value: Value) -> Result<SimpleFilter, Error> {
        let field = field.into();
        let filter = match self {
            Operator::Eq if value.is_null() => SimpleFilter::IsNull { field },
            Operator::Ne if value.is_null() => SimpleFilter::IsNotNull { field },
            Operator::Eq => SimpleFilter::Eq { field, value },
            Operator::Ne => SimpleFilter::Ne { field, value },
            Operator::Lt => SimpleFilter::Lt { field, value },
            Operator::Le => SimpleFilter::Le { field, value },
            Operator::Gt => SimpleFilter::Gt { field, value },
            Operator::Ge => SimpleFilter::Ge { field, value },
            Operator::In => SimpleFilter::In {
                field,
                values: value.into_elements().map_err(|e| Error::InvalidOperand {
                    operator: self.as_str(),
                    reason: e.to_string(),
                })?,
            },
            Operator::NotIn => SimpleFilter::NotIn {
                field,
                values: value.into_elements().map_err(|e| Error::InvalidOperand {
                    operator: self.as_str(),
                    reason: e.to_string(),
                })?,
            },
            Operator::Like | Operator::ILike | Operator::NotLike => {
                let pattern = match value {
                    Value::String(s) => s,
                    other => {
                        return Err(Error::InvalidOperand {
                            operator: self.as_str(),
                            reason: format!("expected a string pattern, got {:?}", other),
                        })
                    }
                };
                match self {
                    Operator::Like => SimpleFilter::Like { field, pattern },
                    Operator::ILike => SimpleFilter::ILike { field, pattern },
                    _ => SimpleFilter::NotLike { field, pattern },
                }
            }
        };
        Ok(filter)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            "like" => Operator::Like,
            "ilike" => Operator::ILike,
            "not like" => Operator::NotLike,
            other => return Err(Error::UnknownOperator(other.to_string())),
        };
        Ok(op)
    }
}

/// The raw right-hand side of a search on one attribute.
///
/// The attribute name travels separately so that a clause on a computed
/// attribute can be handed to its search function unchanged.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct SearchClause {
    /// Comparison operator.
    pub operator: Operator,
    /// Operand.
    pub value: Value,
}

impl SearchClause {
    /// Create a clause.
    pub fn new(operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            operator,
            value: value.into(),
        }
    }

    /// Build the direct predicate of this clause against `field`.
    pub fn on(&self, field: impl Into<String>) -> Result<FilterExpr, Error> {
        self.operator
            .apply(field, self.value.clone())
            .map(FilterExpr::Leaf)
    }
}

/// A single comparison on one field.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum SimpleFilter {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field less than value.
    Lt { field: String, value: Value },
    /// Field less than or equal to value.
    Le { field: String, value: Value },
    /// Field greater than value.
    Gt { field: String, value: Value },
    /// Field greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is not in a set of values.
    NotIn { field: String, values: Vec<Value> },
    /// Field is null.
    IsNull { field: String },
    /// Field is not null.
    IsNotNull { field: String },
    /// Field matches a LIKE pattern.
    Like { field: String, pattern: String },
    /// Field matches a case-insensitive LIKE pattern.
    ILike { field: String, pattern: String },
    /// Field does not match a LIKE pattern.
    NotLike { field: String, pattern: String },
}

impl SimpleFilter {
    /// Name of the field this comparison reads.
    pub fn field(&self) -> &str {
        match self {
            SimpleFilter::Eq { field, .. }
            | SimpleFilter::Ne { field, .. }
            | SimpleFilter::Lt { field, .. }
            | SimpleFilter::Le { field, .. }
            | SimpleFilter::Gt { field, .. }
            | SimpleFilter::Ge { field, .. }
            | SimpleFilter::In { field, .. }
            | SimpleFilter::NotIn { field, .. }
            | SimpleFilter::IsNull { field }
            | SimpleFilter::IsNotNull { field }
            | SimpleFilter::Like { field, .. }
            | SimpleFilter::ILike { field, .. }
            | SimpleFilter::NotLike { field, .. } => field,
        }
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        SimpleFilter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an IN filter.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        SimpleFilter::In {
            field: field.into(),
            values,
        }
    }
}

/// A filter expression.
///
/// Compound expressions hold a flat list of comparisons; nesting is
/// expressed by listing several expressions in a [`Domain`].
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum FilterExpr {
    /// A single comparison.
    Leaf(SimpleFilter),
    /// All comparisons must hold.
    And(Vec<SimpleFilter>),
    /// At least one comparison must hold.
    Or(Vec<SimpleFilter>),
}

impl FilterExpr {
    /// Create an equality expression.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Leaf(SimpleFilter::eq(field, value))
    }

    /// Create an AND expression.
    pub fn and(filters: Vec<SimpleFilter>) -> Self {
        FilterExpr::And(filters)
    }

    /// Create an OR expression.
    pub fn or(filters: Vec<SimpleFilter>) -> Self {
        FilterExpr::Or(filters)
    }

    /// Iterate over every comparison in this expression.
    pub fn comparisons(&self) -> impl Iterator<Item = &SimpleFilter> {
        let slice: &[SimpleFilter] = match self {
            FilterExpr::Leaf(f) => std::slice::from_ref(f),
            FilterExpr::And(fs) | FilterExpr::Or(fs) => fs,
        };
        slice.iter()
    }

    /// Names of all fields referenced by this expression.
    pub fn fields(&self) -> Vec<&str> {
        self.comparisons().map(SimpleFilter::field).collect()
    }
}

impl From<SimpleFilter> for FilterExpr {
    fn from(filter: SimpleFilter) -> Self {
        FilterExpr::Leaf(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_rejects_unrepresentable_ids() {
        let err = Operator::In
            .apply("partner_id", Value::Ids(vec![7, u64::MAX]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperand { operator: "in", .. }));
        assert!(err.to_string().contains(&u64::MAX.to_string()));
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("NOT IN".parse::<Operator>().unwrap(), Operator::NotIn);
        assert_eq!(" ilike ".parse::<Operator>().unwrap(), Operator::ILike);
        assert!(matches!(
            "~".parse::<Operator>(),
            Err(Error::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_apply_null_equality() {
        let f = Operator::Eq.apply("partner", Value::Null).unwrap();
        assert_eq!(
            f,
            SimpleFilter::IsNull {
                field: "partner".into()
            }
        );
        let f = Operator::Ne.apply("partner", Value::Null).unwrap();
        assert!(matches!(f, SimpleFilter::IsNotNull { .. }));
    }

    #[test]
    fn test_apply_in_expands_list() {
        let f = Operator::In.apply("id", Value::Ids(vec![1, 2])).unwrap();
        assert_eq!(
            f,
            SimpleFilter::In {
                field: "id".into(),
                values: vec![Value::Int(1), Value::Int(2)],
            }
        );
    }

    #[test]
    fn test_apply_like_requires_string() {
        let err = Operator::Like.apply("name", Value::Int(3)).unwrap_err();
        assert!(err.to_string().contains("like"));

        let f = Operator::ILike.apply("name", "%ann%".into()).unwrap();
        assert_eq!(f.field(), "name");
    }

    #[test]
    fn test_clause_on_field() {
        let clause = SearchClause::new(Operator::Ge, 10i64);
        let expr = clause.on("amount").unwrap();
        assert_eq!(expr.fields(), vec!["amount"]);
    }

    #[test]
    fn test_expr_fields() {
        let expr = FilterExpr::or(vec![
            SimpleFilter::eq("party.name", "ACME"),
            SimpleFilter::eq("code", "A1"),
        ]);
        assert_eq!(expr.fields(), vec!["party.name", "code"]);
    }

    #[test]
    fn test_expr_json() {
        let expr = FilterExpr::eq("state", "done");
        let json = serde_json::to_string(&expr).unwrap();
        let back: FilterExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, back);
    }
}
