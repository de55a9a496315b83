use std::cmp::Ordering;

use serde_json::Value;

use crate::rules::model::{Condition, Operator};

/// Resolves a dotted path (`customer.tier`) against a JSON fact document.
/// `null` counts as absent.
pub fn lookup<'a>(facts: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = facts;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

pub fn condition_holds(condition: &Condition, facts: &Value) -> bool {
    let Some(actual) = lookup(facts, &condition.field) else {
        return false;
    };
    let expected = match &condition.value_field {
        Some(field) => match lookup(facts, field) {
            Some(value) => value,
            None => return false,
        },
        None => match &condition.value {
            Some(value) => value,
            None => return false,
        },
    };

    match condition.operator {
        Operator::Equals => values_equal(actual, expected),
        Operator::GreaterThan => compare(actual, expected) == Some(Ordering::Greater),
        Operator::LessThan => compare(actual, expected) == Some(Ordering::Less),
        Operator::GreaterEqual => {
            matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal))
        }
        Operator::LessEqual => {
            matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal))
        }
        Operator::Contains => contains(actual, expected, condition.match_any),
        Operator::InList => in_list(actual, expected),
        Operator::NotInList => expected.is_array() && !in_list(actual, expected),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

fn contains(actual: &Value, expected: &Value, match_any: bool) -> bool {
    let haystack = text_of(actual).to_lowercase();
    match expected {
        Value::Array(needles) => {
            let mut hits = needles.iter().map(|needle| haystack.contains(&text_of(needle).to_lowercase()));
            if match_any {
                hits.any(|hit| hit)
            } else {
                hits.all(|hit| hit)
            }
        }
        other => haystack.contains(&text_of(other).to_lowercase()),
    }
}

fn in_list(actual: &Value, expected: &Value) -> bool {
    expected
        .as_array()
        .map_or(false, |candidates| candidates.iter().any(|candidate| values_equal(actual, candidate)))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
