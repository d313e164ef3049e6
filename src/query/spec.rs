use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use crate::client::error::{invalid_argument, KintoResult};

pub(crate) const FIELDS_KEY: &str = "fields";
pub(crate) const LIMIT_KEY: &str = "limit";
pub(crate) const SORT_KEY: &str = "sort";

/// Filter specification for a collection listing.
///
/// The reserved keys `fields`, `limit` and `sort` become Kinto's `_fields`, `_limit` and
/// `_sort` parameters; every other key (`season`, `min_season`, `has_text`...) is passed
/// through as-is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySpec {
    entries: BTreeMap<String, JsonValue>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects the listing onto the given field names.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| JsonValue::String(name.as_ref().to_owned()))
            .collect();
        self.entries
            .insert(FIELDS_KEY.to_string(), JsonValue::Array(names));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.entries.insert(LIMIT_KEY.to_string(), JsonValue::from(limit));
        self
    }

    /// Sort key, prefixed with `-` for descending order.
    pub fn sort(mut self, key: impl Into<String>) -> Self {
        self.entries
            .insert(SORT_KEY.to_string(), JsonValue::String(key.into()));
        self
    }

    /// Adds a pass-through filter such as `("min_season", 10)`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Option<JsonValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes the reserved keys out of the spec and renders the full parameter list.
    ///
    /// Afterwards the spec only holds the pass-through filters. Parameters come back
    /// sorted by name; reserved keys that were absent or `null` are omitted. On error the
    /// spec is left unchanged.
    pub fn render(&mut self) -> KintoResult<Vec<(String, String)>> {
        let reserved = [(FIELDS_KEY, "_fields"), (LIMIT_KEY, "_limit"), (SORT_KEY, "_sort")];

        let mut params = BTreeMap::new();
        for (key, value) in &self.entries {
            if reserved.iter().any(|(name, _)| *name == key.as_str()) {
                continue;
            }
            if let Some(rendered) = render_value(key, value)? {
                params.insert(key.clone(), rendered);
            }
        }

        for (name, param) in reserved {
            if let Some(value) = self.entries.get(name) {
                if let Some(rendered) = render_value(param, value)? {
                    params.insert(param.to_string(), rendered);
                }
            }
        }

        for (name, _) in reserved {
            self.entries.remove(name);
        }
        Ok(params.into_iter().collect())
    }
}

impl From<Map<String, JsonValue>> for QuerySpec {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self {
            entries: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, JsonValue)> for QuerySpec {
    fn from_iter<T: IntoIterator<Item = (K, JsonValue)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }
}

/// Renders a JSON value as a query-string value. Lists are comma-joined.
fn render_value(key: &str, value: &JsonValue) -> KintoResult<Option<String>> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    JsonValue::Array(_) | JsonValue::Object(_) | JsonValue::Null => {
                        return Err(invalid_argument(format!(
                            "Query parameter `{key}` may only list scalar values"
                        )))
                    }
                    scalar => parts.push(render_scalar(scalar)),
                }
            }
            Ok(Some(parts.join(",")))
        }
        JsonValue::Object(_) => Err(invalid_argument(format!(
            "Query parameter `{key}` cannot be an object"
        ))),
        scalar => Ok(Some(render_scalar(scalar))),
    }
}

fn render_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::KintoErrorCode;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn reserved_keys_are_renamed_and_the_rest_passes_through() {
        let mut spec = QuerySpec::new()
            .fields(["text", "character"])
            .limit(10)
            .param("min_season", 10)
            .sort("-episode");

        let params = spec.render().unwrap();

        assert_eq!(
            params,
            pairs(&[
                ("_fields", "text,character"),
                ("_limit", "10"),
                ("_sort", "-episode"),
                ("min_season", "10"),
            ])
        );
        assert_eq!(spec, QuerySpec::new().param("min_season", 10));
    }

    #[test]
    fn field_names_are_stringified() {
        let mut spec: QuerySpec = [("fields", json!(["text", 42, true]))].into_iter().collect();
        assert_eq!(spec.render().unwrap(), pairs(&[("_fields", "text,42,true")]));
        assert!(spec.is_empty());
    }

    #[test]
    fn absent_reserved_keys_are_omitted() {
        let mut spec = QuerySpec::new().param("character", "Kenny").param("season", json!(null));
        assert_eq!(spec.render().unwrap(), pairs(&[("character", "Kenny")]));
    }

    #[test]
    fn rendering_is_deterministic() {
        let build = || {
            QuerySpec::new()
                .param("max_episode", 5)
                .param("has_text", true)
                .sort("season")
        };
        assert_eq!(build().render().unwrap(), build().render().unwrap());
    }

    #[test]
    fn reserved_keys_override_colliding_pass_through_keys() {
        let mut spec = QuerySpec::new().param("_limit", 99).limit(3);
        assert_eq!(spec.render().unwrap(), pairs(&[("_limit", "3")]));
    }

    #[test]
    fn nested_values_are_rejected() {
        let mut spec = QuerySpec::new().param("season", json!({"gt": 3}));
        let err = spec.render().unwrap_err();
        assert_eq!(err.code, KintoErrorCode::InvalidArgument);

        let mut spec = QuerySpec::new().param("fields", json!([["text"]]));
        assert!(spec.render().is_err());
    }

    #[test]
    fn failed_render_keeps_reserved_keys() {
        let build = || {
            QuerySpec::new()
                .limit(10)
                .sort("-episode")
                .param("season", json!({"gt": 3}))
        };
        let mut spec = build();

        assert!(spec.render().is_err());
        assert_eq!(spec, build());
        assert_eq!(spec.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn converts_from_json_map() {
        let map = json!({"fields": ["text"], "limit": 10}).as_object().unwrap().clone();
        let mut spec = QuerySpec::from(map);
        assert_eq!(spec.render().unwrap(), pairs(&[("_fields", "text"), ("_limit", "10")]));
    }
}
