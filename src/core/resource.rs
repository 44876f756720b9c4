//! Behavior shared by every resource adapter: visibility, property values,
//! and the generic search parameters.

use crate::core::error_store::ErrorStore;
use crate::core::query::{Constraint, QueryBuilder, SortField, SortOrder};
use crate::core::request::{Operation, Request};
use crate::domain::model::{Resource, ValueLiteral};
use crate::utils::validation::{bool_flag, numeric_id};
use serde_json::{Map, Value};

pub const IS_PUBLIC_KEY: &str = "o:is_public";

pub const DEFAULT_SORT_FIELDS: &[(&str, SortField)] = &[
    ("id", SortField::Id),
    ("is_public", SortField::IsPublic),
    ("created", SortField::Created),
    ("modified", SortField::Modified),
];

/// `prefix:local` keys outside the reserved `o:` namespace, e.g. `dcterms:title`.
pub fn is_property_term(key: &str) -> bool {
    match key.split_once(':') {
        Some((prefix, local)) => {
            !prefix.is_empty()
                && !local.is_empty()
                && prefix != "o"
                && !prefix.starts_with('@')
                && !local.contains(':')
        }
        None => false,
    }
}

pub fn validate_resource_request(request: &Request, errors: &mut ErrorStore) {
    if let Some(value) = request.value(IS_PUBLIC_KEY) {
        if !value.is_boolean() {
            errors.add_error(IS_PUBLIC_KEY, "Visibility must be a boolean");
        }
    }

    for (key, value) in request.content.iter().filter(|(k, _)| is_property_term(k)) {
        if parse_values(value).is_none() {
            errors.add_error(
                key.clone(),
                "Property values must be an array of {\"@value\": string} objects",
            );
        }
    }
}

/// 填入共用欄位；完整請求會取代所有屬性值，部分更新只取代帶有的屬性
pub fn hydrate_resource(request: &Request, resource: &mut Resource) {
    if request.should_hydrate(IS_PUBLIC_KEY) {
        if let Some(flag) = request.value(IS_PUBLIC_KEY).and_then(Value::as_bool) {
            resource.is_public = flag;
        }
    }

    let partial = request.operation == Operation::Update && request.partial;
    if !partial {
        resource.values.clear();
    }
    for (term, value) in request.content.iter().filter(|(k, _)| is_property_term(k)) {
        match parse_values(value) {
            Some(values) if values.is_empty() => {
                resource.values.remove(term);
            }
            Some(values) => {
                resource.values.insert(term.clone(), values);
            }
            None => {}
        }
    }
}

fn parse_values(value: &Value) -> Option<Vec<ValueLiteral>> {
    value
        .as_array()?
        .iter()
        .map(|entry| {
            entry
                .get("@value")
                .and_then(Value::as_str)
                .map(ValueLiteral::new)
        })
        .collect()
}

/// Applies `id`, `is_public`, `search`, `sort_by`, `sort_order`, `page` and `per_page`.
pub fn build_resource_query(
    qb: &mut QueryBuilder,
    query: &Map<String, Value>,
    sort_fields: &[(&str, SortField)],
) {
    if let Some(id) = query.get("id").and_then(numeric_id) {
        qb.and_where(Constraint::Id(id));
    }

    if let Some(flag) = query.get("is_public").and_then(bool_flag) {
        qb.and_where(Constraint::IsPublic(flag));
    }

    if let Some(search) = query.get("search").and_then(Value::as_str) {
        let search = search.trim();
        if !search.is_empty() {
            qb.and_where(Constraint::ValueContains(search.to_string()));
        }
    }

    let order = query
        .get("sort_order")
        .and_then(Value::as_str)
        .and_then(SortOrder::parse)
        .unwrap_or_default();
    if let Some(sort_by) = query.get("sort_by").and_then(Value::as_str) {
        match sort_fields.iter().find(|(name, _)| *name == sort_by) {
            Some((_, field)) => {
                qb.order_by(*field, order);
            }
            None => {
                tracing::debug!("Ignoring unknown sort field '{}'", sort_by);
                qb.order_by(SortField::Id, order);
            }
        }
    } else {
        qb.order_by(SortField::Id, order);
    }

    if let Some(page) = query.get("page").and_then(numeric_id) {
        let per_page = query
            .get("per_page")
            .and_then(numeric_id)
            .map(|n| n as usize);
        qb.paginate(page as usize, per_page);
    }
}
