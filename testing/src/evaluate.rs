//! In-process evaluation of [`Query`] clauses.
//!
//! Values are compared in their JSON form. Integers compare exactly; a
//! comparison involving a float compares as `f64`, so `120` equals `120.0`.
//! Strings compare
//! lexicographically (which orders RFC 3339 timestamps chronologically).
//! An attribute the entity does not carry is treated as `null`.

use railyard_core::entity::Entity;
use railyard_core::query::{Clause, Direction, Operator, Query};
use railyard_core::repository::{RepositoryError, RepositoryResult};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Apply `query` to `entities`: filter, sort, then page.
///
/// # Errors
///
/// [`RepositoryError::UnsupportedOperator`] for [`Operator::Other`].
pub fn apply<E: Entity>(query: &Query<E>, entities: Vec<E>) -> RepositoryResult<Vec<E>> {
    if let Some(clause) = query
        .clauses()
        .iter()
        .find(|clause| matches!(clause.operator, Operator::Other(_)))
    {
        return Err(RepositoryError::UnsupportedOperator(
            clause.operator.to_string(),
        ));
    }

    let mut matched: Vec<E> = entities
        .into_iter()
        .filter(|entity| query.clauses().iter().all(|clause| matches(entity, clause)))
        .collect();

    if !query.sort_keys().is_empty() {
        matched.sort_by(|a, b| {
            query
                .sort_keys()
                .iter()
                .map(|key| {
                    let ordering = compare(
                        &a.attribute(&key.property).unwrap_or(Value::Null),
                        &b.attribute(&key.property).unwrap_or(Value::Null),
                    );
                    match key.direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    let offset = query.offset().unwrap_or(0);
    let limit = query.limit().unwrap_or(usize::MAX);
    Ok(matched.into_iter().skip(offset).take(limit).collect())
}

/// Whether `entity` satisfies `clause`.
#[must_use]
pub fn matches<E: Entity>(entity: &E, clause: &Clause) -> bool {
    let actual = entity.attribute(&clause.property).unwrap_or(Value::Null);
    let operand = &clause.value;
    match &clause.operator {
        Operator::Eq => equal(&actual, operand),
        Operator::Ne => !equal(&actual, operand),
        Operator::In => candidates(operand).any(|candidate| equal(&actual, candidate)),
        Operator::NotIn => !candidates(operand).any(|candidate| equal(&actual, candidate)),
        Operator::Gt => ordered(&actual, operand).is_some_and(Ordering::is_gt),
        Operator::Gte => ordered(&actual, operand).is_some_and(Ordering::is_ge),
        Operator::Lt => ordered(&actual, operand).is_some_and(Ordering::is_lt),
        Operator::Lte => ordered(&actual, operand).is_some_and(Ordering::is_le),
        Operator::Contains => match (&actual, operand) {
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            (Value::Array(items), needle) => items.iter().any(|item| equal(item, needle)),
            _ => false,
        },
        Operator::Other(_) => false,
    }
}

fn candidates(operand: &Value) -> impl Iterator<Item = &Value> {
    operand.as_array().into_iter().flatten()
}

fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_cmp(x, y).is_some_and(Ordering::is_eq),
        _ => a == b,
    }
}

/// Exact for integers of either sign; `f64` once a float is involved.
fn number_cmp(x: &Number, y: &Number) -> Option<Ordering> {
    match (x.as_i64(), y.as_i64(), x.as_u64(), y.as_u64()) {
        (Some(x), Some(y), _, _) => Some(x.cmp(&y)),
        (_, _, Some(x), Some(y)) => Some(x.cmp(&y)),
        // An i64 against a u64 above i64::MAX.
        (Some(_), None, _, Some(_)) => Some(Ordering::Less),
        (None, Some(_), Some(_), _) => Some(Ordering::Greater),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

/// Ordering between two values of the same kind; `None` across kinds.
fn ordered(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_cmp(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order used for sorting: null < bool < number < string < other.
fn compare(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    ordered(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures::Account;
    use railyard_core::entity::EntityId;
    use serde_json::json;

    fn clause(property: &str, operator: Operator, value: Value) -> Clause {
        Clause {
            property: property.to_string(),
            operator,
            value,
        }
    }

    fn ada() -> Account {
        Account::new("ada@example.com")
            .with_id(EntityId::new("1"))
            .with_balance(120)
            .with_tags(["admin", "beta"])
    }

    #[test]
    fn test_equality_is_numeric_across_representations() {
        assert!(matches(&ada(), &clause("balance", Operator::Eq, json!(120.0))));
        assert!(!matches(&ada(), &clause("balance", Operator::Ne, json!(120))));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let big = Account::new("ada@example.com").with_balance(9_007_199_254_740_993);
        assert!(!matches(&big, &clause("balance", Operator::Eq, json!(9_007_199_254_740_992_i64))));
        assert!(matches(&big, &clause("balance", Operator::Gt, json!(9_007_199_254_740_992_i64))));
        assert!(matches(&big, &clause("balance", Operator::NotIn, json!([9_007_199_254_740_992_i64]))));
        assert!(matches(&big, &clause("balance", Operator::Lt, json!(u64::MAX))));
        assert!(matches(&ada(), &clause("balance", Operator::Gt, json!(-1))));
    }

    #[test]
    fn test_membership_operators() {
        assert!(matches(&ada(), &clause("id", Operator::In, json!(["1", "2"]))));
        assert!(matches(&ada(), &clause("id", Operator::NotIn, json!(["3"]))));
        assert!(!matches(&ada(), &clause("id", Operator::NotIn, json!(["1"]))));
    }

    #[test]
    fn test_range_operators_ignore_mismatched_kinds() {
        assert!(matches(&ada(), &clause("balance", Operator::Gt, json!(100))));
        assert!(matches(&ada(), &clause("balance", Operator::Lte, json!(120))));
        assert!(!matches(&ada(), &clause("balance", Operator::Lt, json!("200"))));
    }

    #[test]
    fn test_contains_on_strings_and_arrays() {
        assert!(matches(&ada(), &clause("email", Operator::Contains, json!("@example"))));
        assert!(matches(&ada(), &clause("tags", Operator::Contains, json!("beta"))));
        assert!(!matches(&ada(), &clause("tags", Operator::Contains, json!("owner"))));
    }

    #[test]
    fn test_missing_attribute_is_null() {
        let account = ada();
        assert!(matches(&account, &clause("plan", Operator::Eq, Value::Null)));
    }

    #[test]
    fn test_other_operator_is_unsupported() {
        let query = Query::<Account>::new()
            .filter("email", "regex", json!("^a"))
            .unwrap();
        assert_eq!(
            apply(&query, vec![ada()]),
            Err(RepositoryError::UnsupportedOperator("regex".to_string()))
        );
    }
}
