use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use restward_domain::{
    CollectionQuery, FilterClause, FilterOperator, ResourceSchema, SortClause, SortDirection,
};
use serde_json::{Map, Value};

use super::{Appender, RelationLink, Table};

pub(super) fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

pub(super) fn apply_query(
    tables: &HashMap<String, Table>,
    relations: &HashMap<(String, String), RelationLink>,
    appenders: &HashMap<(String, String), Appender>,
    schema: &ResourceSchema,
    query: &CollectionQuery,
) -> Vec<Map<String, Value>> {
    let Some(table) = tables.get(schema.resource_type().as_str()) else {
        return Vec::new();
    };

    let mut rows: Vec<(&String, &Map<String, Value>)> = table
        .iter()
        .filter(|(_, row)| {
            query.constraints.iter().all(|constraint| {
                row.get(&constraint.field)
                    .is_some_and(|stored| values_match(stored, &constraint.value))
            }) && query.filters.iter().all(|filter| matches_filter(row, filter))
        })
        .collect();

    rows.sort_by(|(left_key, left), (right_key, right)| {
        for sort in &query.sorts {
            let ordering = compare_for_sort(left, right, sort);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        left_key.cmp(right_key)
    });

    let limit = query.limit.unwrap_or(usize::MAX);
    rows.into_iter()
        .take(limit)
        .map(|(_, row)| shape_row(tables, relations, appenders, schema, query, row))
        .collect()
}

fn values_match(stored: &Value, expected: &Value) -> bool {
    if stored == expected {
        return true;
    }

    match (key_string(stored), key_string(expected)) {
        (Some(stored), Some(expected)) => stored == expected,
        _ => false,
    }
}

fn matches_filter(row: &Map<String, Value>, filter: &FilterClause) -> bool {
    let Some(stored) = row.get(&filter.field) else {
        return false;
    };
    let text = match stored {
        Value::String(value) => value.clone(),
        Value::Null => return false,
        other => other.to_string(),
    };

    match filter.operator {
        FilterOperator::Exact => text == filter.value,
        FilterOperator::Partial => text
            .to_lowercase()
            .contains(filter.value.to_lowercase().as_str()),
    }
}

fn compare_for_sort(
    left: &Map<String, Value>,
    right: &Map<String, Value>,
    sort: &SortClause,
) -> Ordering {
    let ordering = match (left.get(&sort.field), right.get(&sort.field)) {
        (Some(left), Some(right)) => compare_values(left, right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .zip(right.as_f64())
            .and_then(|(left, right)| left.partial_cmp(&right))
            .unwrap_or(Ordering::Equal),
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn shape_row(
    tables: &HashMap<String, Table>,
    relations: &HashMap<(String, String), RelationLink>,
    appenders: &HashMap<(String, String), Appender>,
    schema: &ResourceSchema,
    query: &CollectionQuery,
    row: &Map<String, Value>,
) -> Map<String, Value> {
    let resource_type = schema.resource_type().as_str();
    let mut shaped = if query.fields.is_empty() {
        row.clone()
    } else {
        let selected: BTreeSet<&str> = query.fields.iter().map(String::as_str).collect();
        row.iter()
            .filter(|(name, _)| selected.contains(name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    };

    let loaded: BTreeSet<&String> = query.with.iter().chain(&query.includes).collect();
    for name in loaded {
        let Some(link) = relations.get(&(resource_type.to_owned(), name.clone())) else {
            continue;
        };
        shaped.insert(name.clone(), load_relation(tables, link, row));
    }

    for name in &query.appends {
        if let Some(appender) = appenders.get(&(resource_type.to_owned(), name.clone())) {
            shaped.insert(name.clone(), appender(row));
        }
    }

    shaped
}

fn load_relation(
    tables: &HashMap<String, Table>,
    link: &RelationLink,
    parent: &Map<String, Value>,
) -> Value {
    let Some(local) = parent.get(&link.local_key) else {
        return Value::Array(Vec::new());
    };

    let related: Vec<Value> = tables
        .get(&link.target_type)
        .map(|table| {
            table
                .values()
                .filter(|row| {
                    row.get(&link.foreign_key)
                        .is_some_and(|foreign| values_match(foreign, local))
                })
                .map(|row| Value::Object(row.clone()))
                .collect()
        })
        .unwrap_or_default();

    Value::Array(related)
}
