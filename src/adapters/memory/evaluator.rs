//! Filter evaluation and ordering over JSON documents
//!
//! Mirrors the Cosmos DB SQL semantics the store relies on: comparisons
//! between values of different types are undefined, undefined propagates
//! through `NOT`, and only a predicate that is definitely true selects the
//! document.

use crate::domain::query::{CompareOp, Filter, OrderBy, SortDirection};
use serde_json::Value;
use std::cmp::Ordering;

/// Whether `document` satisfies `filter`
pub fn matches(filter: &Filter, document: &Value) -> bool {
    evaluate(filter, document) == Some(true)
}

/// Three-valued evaluation; `None` is SQL undefined
fn evaluate(filter: &Filter, document: &Value) -> Option<bool> {
    match filter {
        Filter::Compare { field, op, value } => {
            let actual = field.resolve(document)?;
            let ordering = compare_scalars(actual, value)?;
            Some(match op {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
            })
        }
        Filter::Contains { field, value } => field
            .resolve(document)?
            .as_str()
            .map(|s| s.contains(value.as_str())),
        Filter::StartsWith { field, value } => field
            .resolve(document)?
            .as_str()
            .map(|s| s.starts_with(value.as_str())),
        Filter::IsDefined(field) => Some(field.resolve(document).is_some()),
        Filter::And(parts) => {
            let mut result = Some(true);
            for part in parts {
                match evaluate(part, document) {
                    Some(false) => return Some(false),
                    None => result = None,
                    Some(true) => {}
                }
            }
            result
        }
        Filter::Or(parts) => {
            let mut result = Some(false);
            for part in parts {
                match evaluate(part, document) {
                    Some(true) => return Some(true),
                    None => result = None,
                    Some(false) => {}
                }
            }
            result
        }
        Filter::Not(inner) => evaluate(inner, document).map(|b| !b),
    }
}

/// Compares two values of the same scalar type
///
/// Equality also holds for structurally equal arrays and objects.
fn compare_scalars(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (left == right).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

/// Rank of a value's type in `ORDER BY`
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Bool(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Object(_)) => 6,
    }
}

/// Total order used by `ORDER BY`: type rank first, then value
pub fn compare_for_ordering(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let by_rank = type_rank(left).cmp(&type_rank(right));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (left, right) {
        (Some(a), Some(b)) => compare_scalars(a, b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// Stable sort by the ordering key; ties keep their incoming order
pub fn sort_documents(documents: &mut [Value], order_by: &OrderBy) {
    documents.sort_by(|a, b| {
        let ordering = compare_for_ordering(order_by.field.resolve(a), order_by.field.resolve(b));
        match order_by.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}
