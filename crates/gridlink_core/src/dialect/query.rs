//! Native queries, query parameters and criteria.

use crate::tuple::Tuple;
use gridlink_codec::Value;
use std::collections::BTreeMap;

/// Iterator of result tuples.
pub type TupleIter = Box<dyn Iterator<Item = Tuple> + Send>;

/// A query in the backend's own language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeQuery {
    text: String,
}

impl NativeQuery {
    /// Wraps query text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Returns the query text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Named parameters and row selection of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    named: BTreeMap<String, Value>,
    first_row: Option<usize>,
    max_rows: Option<usize>,
}

impl QueryParameters {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a named parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Skips the first `n` rows.
    #[must_use]
    pub const fn first_row(mut self, n: usize) -> Self {
        self.first_row = Some(n);
        self
    }

    /// Returns at most `n` rows.
    #[must_use]
    pub const fn max_rows(mut self, n: usize) -> Self {
        self.max_rows = Some(n);
        self
    }

    /// Returns a bound parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Returns all bound parameters.
    #[must_use]
    pub fn named(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    /// Applies the row selection to a result iterator.
    #[must_use]
    pub fn select_rows(&self, rows: TupleIter) -> TupleIter {
        let skipped = rows.skip(self.first_row.unwrap_or(0));
        match self.max_rows {
            Some(n) => Box::new(skipped.take(n)),
            None => Box::new(skipped),
        }
    }
}

/// One condition of a [`Criteria`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Column equals a non-null value.
    Eq(String, Value),
    /// Column is absent or null.
    IsNull(String),
    /// Column holds a non-null value.
    NotNull(String),
    /// Column equals one of the values.
    In(String, Vec<Value>),
}

impl Predicate {
    /// Evaluates the predicate against a tuple.
    #[must_use]
    pub fn matches(&self, tuple: &Tuple) -> bool {
        let present = |column: &str| tuple.get(column).filter(|v| !v.is_null());
        match self {
            Self::Eq(column, value) => present(column) == Some(value),
            Self::IsNull(column) => present(column).is_none(),
            Self::NotNull(column) => present(column).is_some(),
            Self::In(column, values) => present(column).is_some_and(|v| values.contains(v)),
        }
    }
}

/// A structured conjunctive query over one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    table: String,
    predicates: Vec<Predicate>,
    limit: Option<usize>,
}

impl Criteria {
    /// Starts a criteria matching every row of `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            limit: None,
        }
    }

    /// Requires `column == value`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq(column.into(), value.into()));
        self
    }

    /// Requires `column` to be null or absent.
    #[must_use]
    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.predicates.push(Predicate::IsNull(column.into()));
        self
    }

    /// Requires `column` to hold a value.
    #[must_use]
    pub fn not_null(mut self, column: impl Into<String>) -> Self {
        self.predicates.push(Predicate::NotNull(column.into()));
        self
    }

    /// Requires `column` to equal one of `values`.
    #[must_use]
    pub fn is_in(mut self, column: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        self.predicates
            .push(Predicate::In(column.into(), values.into_iter().collect()));
        self
    }

    /// Returns at most `n` rows.
    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Returns the table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the predicates.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Returns the row limit.
    #[must_use]
    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Whether a tuple satisfies every predicate.
    #[must_use]
    pub fn matches(&self, tuple: &Tuple) -> bool {
        self.predicates.iter().all(|p| p.matches(tuple))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str, age: Option<i64>) -> Tuple {
        let mut tuple = Tuple::new();
        tuple.put("name", name);
        if let Some(age) = age {
            tuple.put("age", age);
        } else {
            tuple.put_null("age");
        }
        tuple
    }

    #[test]
    fn criteria_combine_predicates() {
        let criteria = Criteria::new("people").eq("name", "Ann").not_null("age");
        assert!(criteria.matches(&person("Ann", Some(30))));
        assert!(!criteria.matches(&person("Ann", None)));
        assert!(!criteria.matches(&person("Bob", Some(30))));
    }

    #[test]
    fn null_predicates_treat_absent_as_null() {
        let mut tuple = Tuple::new();
        tuple.put("name", "Ann");
        assert!(Predicate::IsNull("age".into()).matches(&tuple));
        assert!(Predicate::IsNull("age".into()).matches(&person("Ann", None)));
        assert!(!Predicate::Eq("age".into(), Value::Null).matches(&person("Ann", None)));
    }

    #[test]
    fn in_predicate_checks_membership() {
        let criteria = Criteria::new("people").is_in("name", [Value::from("Ann"), Value::from("Bob")]);
        assert!(criteria.matches(&person("Bob", None)));
        assert!(!criteria.matches(&person("Cid", None)));
    }

    #[test]
    fn row_selection_skips_and_limits() {
        let rows: TupleIter = Box::new((0..10).map(|i| {
            let mut t = Tuple::new();
            t.put("i", i64::from(i));
            t
        }));
        let selected: Vec<_> = QueryParameters::new()
            .first_row(2)
            .max_rows(3)
            .select_rows(rows)
            .map(|t| t.get("i").cloned())
            .collect();
        assert_eq!(
            selected,
            vec![Some(Value::Integer(2)), Some(Value::Integer(3)), Some(Value::Integer(4))]
        );
    }
}
