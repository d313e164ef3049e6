use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::client::error::{decode_error, KintoResult};

/// Decoded JSON object returned by a Kinto endpoint.
///
/// Keys are kept in a deterministic order. Use [`KintoResponse::data`] for the `data`
/// envelope that every bucket, collection and record endpoint answers with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KintoResponse {
    fields: Map<String, JsonValue>,
}

impl KintoResponse {
    pub fn new(fields: Map<String, JsonValue>) -> Self {
        Self { fields }
    }

    /// Wraps a decoded body. An empty body decodes to an empty response.
    pub fn from_value(value: JsonValue) -> KintoResult<Self> {
        match value {
            JsonValue::Object(fields) => Ok(Self { fields }),
            JsonValue::Null => Ok(Self::default()),
            other => Err(decode_error(format!(
                "Expected a JSON object from Kinto, got: {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    pub fn data(&self) -> Option<&JsonValue> {
        self.get("data")
    }

    /// The `data` envelope of a single-object response.
    pub fn data_object(&self) -> KintoResult<&Map<String, JsonValue>> {
        self.data()
            .and_then(JsonValue::as_object)
            .ok_or_else(|| decode_error("Kinto response is missing a `data` object"))
    }

    /// The `data` envelope of a listing response.
    pub fn data_list(&self) -> KintoResult<&Vec<JsonValue>> {
        self.data()
            .and_then(JsonValue::as_array)
            .ok_or_else(|| decode_error("Kinto response is missing a `data` list"))
    }

    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, JsonValue> {
        self.fields
    }
}

/// HTTP verb of a batched operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl OperationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMethod::Get => "GET",
            OperationMethod::Post => "POST",
            OperationMethod::Put => "PUT",
            OperationMethod::Patch => "PATCH",
            OperationMethod::Delete => "DELETE",
        }
    }
}

/// One pending REST call inside a batch request.
///
/// `path` is relative to the API version prefix, as the batch endpoint expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub method: OperationMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
}

/// Aggregate reply of `POST /batch`, positionally matching the submitted operations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub responses: Vec<BatchSubResponse>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSubResponse {
    pub status: u16,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub body: JsonValue,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl BatchSubResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn data(&self) -> Option<&Map<String, JsonValue>> {
        self.body.get("data").and_then(JsonValue::as_object)
    }
}

impl BatchResponse {
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchSubResponse> {
        self.responses.iter()
    }

    pub fn all_succeeded(&self) -> bool {
        self.responses.iter().all(BatchSubResponse::is_success)
    }

    /// Sub-responses with a non-2xx status, paired with their position in the batch.
    pub fn failures(&self) -> Vec<(usize, &BatchSubResponse)> {
        self.responses
            .iter()
            .enumerate()
            .filter(|(_, response)| !response.is_success())
            .collect()
    }
}

/// Backend status as reported by `GET /__heartbeat__`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct HealthcheckResponse {
    #[serde(default)]
    pub permission: Option<bool>,
    #[serde(default)]
    pub storage: Option<bool>,
    #[serde(default)]
    pub cache: Option<bool>,
}

impl HealthcheckResponse {
    /// A backend reported as `null` is not configured and does not count as a failure.
    pub fn is_healthy(&self) -> bool {
        [self.permission, self.storage, self.cache]
            .iter()
            .all(|status| status.unwrap_or(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_requires_an_object() {
        assert!(KintoResponse::from_value(json!([1, 2])).is_err());
        assert_eq!(
            KintoResponse::from_value(JsonValue::Null).unwrap(),
            KintoResponse::default()
        );
    }

    #[test]
    fn data_accessors() {
        let response = KintoResponse::from_value(json!({
            "data": {"id": "abc", "last_modified": 1456}
        }))
        .unwrap();
        assert_eq!(response.data_object().unwrap()["id"], json!("abc"));
        assert!(response.data_list().is_err());
    }

    #[test]
    fn batch_failures_keep_positions() {
        let batch: BatchResponse = serde_json::from_value(json!({
            "responses": [
                {"status": 201, "path": "/v1/buckets/b/collections/c/records", "body": {}},
                {"status": 400, "path": "/v1/buckets/b/collections/c/records", "body": {}},
                {"status": 201, "path": "/v1/buckets/b/collections/c/records", "body": {}}
            ]
        }))
        .unwrap();

        assert_eq!(batch.len(), 3);
        assert!(!batch.all_succeeded());
        let failures = batch.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert_eq!(failures[0].1.status, 400);
    }

    #[test]
    fn operation_serializes_to_batch_request_shape() {
        let operation = Operation {
            method: OperationMethod::Post,
            path: "/buckets/blog/collections/posts/records".to_string(),
            body: Some(json!({"data": {"title": "First!"}})),
        };
        assert_eq!(
            serde_json::to_value(&operation).unwrap(),
            json!({
                "method": "POST",
                "path": "/buckets/blog/collections/posts/records",
                "body": {"data": {"title": "First!"}}
            })
        );

        let delete = Operation {
            method: OperationMethod::Delete,
            path: "/buckets/blog/collections/posts/records/abc".to_string(),
            body: None,
        };
        assert_eq!(
            serde_json::to_value(&delete).unwrap(),
            json!({"method": "DELETE", "path": "/buckets/blog/collections/posts/records/abc"})
        );
    }

    #[test]
    fn heartbeat_treats_missing_backends_as_healthy() {
        let health: HealthcheckResponse =
            serde_json::from_value(json!({"permission": true, "storage": true, "cache": null}))
                .unwrap();
        assert!(health.is_healthy());

        let degraded: HealthcheckResponse =
            serde_json::from_value(json!({"permission": true, "storage": false})).unwrap();
        assert!(!degraded.is_healthy());
    }
}
