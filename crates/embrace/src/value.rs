//! Values bound in a template's variable pool.
//!
//! Plain data is `serde_json::Value` (the `preserve_order` feature keeps
//! mapping iteration in encounter order); a binding may also be a nested
//! template, referenced by its arena id so parent back-links stay plain
//! indices and cyclic include graphs cannot leak.

use serde_json::Value as Json;

use crate::engine::TemplateId;

/// A value bound to a name in a template's variable pool.
#[derive(Debug, Clone)]
pub enum Value {
    /// Plain data: scalar, sequence, or mapping.
    Data(Json),
    /// A nested template, rendered lazily when resolved.
    Template(TemplateId),
}

impl Value {
    /// Shorthand for a nested-template value.
    pub fn template(id: TemplateId) -> Self {
        Value::Template(id)
    }

    /// True for sequences and mappings, the shapes a tag with inner content
    /// iterates over.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Data(Json::Array(_)) | Value::Data(Json::Object(_)))
    }

    /// Emptiness as the resolver sees it: null, `false`, numeric zero, the
    /// empty string, or an empty container. A nested template is never
    /// empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Template(_) => false,
            Value::Data(json) => is_json_empty(json),
        }
    }

    /// Iteration entries for a container value, in encounter order. The key
    /// is the element index for sequences and the member name for mappings.
    pub(crate) fn entries(&self) -> Vec<(Json, Json)> {
        match self {
            Value::Data(Json::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Json::from(i as u64), v.clone()))
                .collect(),
            Value::Data(Json::Object(map)) => map
                .iter()
                .map(|(k, v)| (Json::String(k.clone()), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::Data(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Data(Json::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Data(Json::String(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Data(Json::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Data(Json::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Data(Json::Bool(b))
    }
}

/// Emptiness for plain JSON data. Numeric zero and the empty string count as
/// empty so comparison-free conditional tags behave like truth tests.
pub(crate) fn is_json_empty(json: &Json) -> bool {
    match json {
        Json::Null => true,
        Json::Bool(b) => !b,
        Json::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Json::String(s) => s.is_empty(),
        Json::Array(items) => items.is_empty(),
        Json::Object(map) => map.is_empty(),
    }
}

/// Formats a JSON scalar for template output. Containers never reach output
/// directly (they are iterated or dropped by the projector) and format as
/// empty.
pub(crate) fn format_json(json: &Json) -> String {
    match json {
        Json::String(s) => s.clone(),
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Null => String::new(),
        Json::Array(_) | Json::Object(_) => String::new(),
    }
}

/// Parses a numeric-looking string into a finite float, the coercion applied
/// to comparison operands.
pub(crate) fn numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}
