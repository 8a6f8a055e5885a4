//! Shared argument shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tool::{ParamResult, ParameterValidationError, json_type_name};

/// Free-form key/value arguments, iterated in insertion order.
pub type PropertyMap = Map<String, Value>;

/// A content-fragment element value: one string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Values in order; a single string yields one item.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            StringOrList::One(s) => std::slice::from_ref(s),
            StringOrList::Many(v) => v,
        };
        slice.iter().map(String::as_str)
    }
}

/// Ordered element map for content fragments.
pub type ElementMap = Vec<(String, StringOrList)>;

/// Parse a `{name: string | [string]}` object, keeping insertion order.
/// Null entries are dropped.
pub fn element_map(name: &str, map: &PropertyMap) -> ParamResult<ElementMap> {
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(key, value)| {
            StringOrList::deserialize(value)
                .map(|parsed| (key.clone(), parsed))
                .map_err(|_| {
                    ParameterValidationError::invalid_type(
                        format!("{}.{}", name, key),
                        "string or array of strings",
                        json_type_name(value),
                    )
                })
        })
        .collect()
}

/// Flatten one property into form values.
///
/// Scalars become a single value, arrays one value per element, `null` none.
/// Nested objects are sent as their JSON text.
pub fn form_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().flat_map(form_values).collect(),
        Value::String(s) => vec![s.clone()],
        other => vec![other.to_string()],
    }
}

/// Flatten a property map into ordered form or query pairs.
pub fn flatten_properties(map: &PropertyMap) -> Vec<(String, String)> {
    map.iter()
        .flat_map(|(key, value)| {
            form_values(value)
                .into_iter()
                .map(move |v| (key.clone(), v))
        })
        .collect()
}
