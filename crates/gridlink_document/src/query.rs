//! JSON native queries.
//!
//! A query names a collection and an optional filter:
//!
//! ```json
//! { "collection": "users", "filter": { "name": ":name", "age": 42, "deleted": null } }
//! ```
//!
//! Each filter entry is an equality test. `null` matches absent or null
//! columns, an array matches any of its values, and a string starting with
//! `:` is replaced by the named query parameter.

use gridlink_codec::Value;
use gridlink_core::{Criteria, DialectError, DialectResult, QueryParameters};
use serde::Deserialize;
use serde_json::{Map, Value as Json};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QuerySpec {
    collection: String,
    #[serde(default)]
    filter: Map<String, Json>,
}

/// Parses a native query into criteria, binding named parameters.
///
/// # Errors
///
/// Returns [`DialectError::InvalidQuery`] if the text is not a valid query,
/// names a missing parameter or uses a nested document as a value.
pub fn parse_native_query(text: &str, parameters: &QueryParameters) -> DialectResult<Criteria> {
    let spec: QuerySpec = serde_json::from_str(text).map_err(|e| DialectError::invalid_query(e.to_string()))?;
    if spec.collection.is_empty() {
        return Err(DialectError::invalid_query("collection must not be empty"));
    }

    let mut criteria = Criteria::new(spec.collection);
    for (column, json) in spec.filter {
        criteria = match json {
            Json::Array(items) => {
                let values = items
                    .into_iter()
                    .map(|item| to_value(item, parameters))
                    .collect::<DialectResult<Vec<_>>>()?;
                criteria.is_in(column, values)
            }
            other => match to_value(other, parameters)? {
                Value::Null => criteria.is_null(column),
                value => criteria.eq(column, value),
            },
        };
    }
    Ok(criteria)
}

fn to_value(json: Json, parameters: &QueryParameters) -> DialectResult<Value> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Integer(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| DialectError::invalid_query(format!("number out of range: {n}"))),
        },
        Json::String(s) => match s.strip_prefix(':') {
            Some(name) => parameters
                .get(name)
                .cloned()
                .ok_or_else(|| DialectError::invalid_query(format!("missing parameter `{name}`"))),
            None => Ok(Value::Text(s)),
        },
        Json::Array(_) | Json::Object(_) => Err(DialectError::invalid_query(
            "nested arrays and documents are not supported in filters",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_core::Predicate;

    #[test]
    fn filter_entries_become_predicates() {
        let params = QueryParameters::new().with("name", "ada");
        let criteria = parse_native_query(
            r#"{"collection":"users","filter":{"name":":name","age":[30,31],"deleted":null}}"#,
            &params,
        )
        .unwrap();
        assert_eq!(criteria.table(), "users");
        assert_eq!(
            criteria.predicates(),
            &[
                Predicate::In("age".into(), vec![Value::Integer(30), Value::Integer(31)]),
                Predicate::IsNull("deleted".into()),
                Predicate::Eq("name".into(), Value::from("ada")),
            ]
        );
    }

    #[test]
    fn missing_parameter_is_invalid() {
        let err = parse_native_query(r#"{"collection":"users","filter":{"name":":name"}}"#, &QueryParameters::new())
            .unwrap_err();
        assert!(matches!(err, DialectError::InvalidQuery { .. }));
    }

    #[test]
    fn malformed_json_is_invalid() {
        assert!(parse_native_query("db.users.find()", &QueryParameters::new()).is_err());
        assert!(parse_native_query(r#"{"collection":"users","sort":{}}"#, &QueryParameters::new()).is_err());
        assert!(parse_native_query(r#"{"collection":"users","filter":{"a":{"$gt":1}}}"#, &QueryParameters::new()).is_err());
    }
}
