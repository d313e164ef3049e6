use reqwest::Method;
use serde_json::{json, Map, Value as JsonValue};

use crate::client::constants::{
    bucket_path, collection_path, collections_path, record_path, records_path, BATCH_PATH,
    BUCKETS_PATH, CREATED, CREATED_OR_EXISTING, HEARTBEAT_PATH, OK,
};
use crate::client::error::{decode_error, KintoResult};
use crate::client::transport::{HttpTransport, Transport, TransportRequest};
use crate::client::types::{BatchResponse, HealthcheckResponse, KintoResponse, Operation};

/// Typed surface over the bucket → collection → record hierarchy.
///
/// The gateway and query layers only depend on this trait, so tests and alternative
/// transports can stand in for the HTTP client.
pub trait ResourceClient: Send + Sync {
    /// Creates a bucket. An existing bucket is answered with 200 and is not an error.
    fn create_bucket(&self, name: &str) -> KintoResult<KintoResponse>;

    fn get_bucket(&self, name: &str) -> KintoResult<KintoResponse>;

    fn list_buckets(&self) -> KintoResult<KintoResponse>;

    /// Creates a collection inside `bucket`. Idempotent like [`Self::create_bucket`].
    fn create_collection(&self, bucket: &str, name: &str) -> KintoResult<KintoResponse>;

    fn get_collection(&self, bucket: &str, collection: &str) -> KintoResult<KintoResponse>;

    /// Lists records with the given query parameters (`_limit`, `_sort`, filters...).
    fn list_records(
        &self,
        bucket: &str,
        collection: &str,
        query: &[(String, String)],
    ) -> KintoResult<KintoResponse>;

    fn create_record(
        &self,
        bucket: &str,
        collection: &str,
        data: Map<String, JsonValue>,
    ) -> KintoResult<KintoResponse>;

    fn get_record(&self, bucket: &str, collection: &str, id: &str) -> KintoResult<KintoResponse>;

    /// Replaces the whole record stored under `id`.
    fn update_record(
        &self,
        bucket: &str,
        collection: &str,
        id: &str,
        data: Map<String, JsonValue>,
    ) -> KintoResult<KintoResponse>;

    fn delete_record(&self, bucket: &str, collection: &str, id: &str)
        -> KintoResult<KintoResponse>;

    /// Submits every operation in one request. Sub-responses keep the submission order.
    fn batch(&self, operations: Vec<Operation>) -> KintoResult<BatchResponse>;
}

/// Kinto client over a [`Transport`], by default the blocking HTTP one.
#[derive(Clone, Debug)]
pub struct KintoClient<T = HttpTransport> {
    transport: T,
}

impl KintoClient<HttpTransport> {
    /// Client configured from `KINTO_URL` / `KINTO_TOKEN`.
    pub fn from_env() -> KintoResult<Self> {
        Ok(Self::new(HttpTransport::from_env()?))
    }
}

impl<T: Transport> KintoClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn healthcheck(&self) -> KintoResult<HealthcheckResponse> {
        let body = self
            .transport
            .request(TransportRequest::new(Method::GET, HEARTBEAT_PATH))?;
        serde_json::from_value(body)
            .map_err(|err| decode_error(format!("Invalid heartbeat response: {err}")))
    }

    /// Server capabilities, version and settings as advertised by `GET /`.
    pub fn info(&self) -> KintoResult<KintoResponse> {
        self.send(TransportRequest::new(Method::GET, "/").expecting(OK))
    }

    fn send(&self, request: TransportRequest) -> KintoResult<KintoResponse> {
        KintoResponse::from_value(self.transport.request(request)?)
    }
}

impl<T: Transport> ResourceClient for KintoClient<T> {
    fn create_bucket(&self, name: &str) -> KintoResult<KintoResponse> {
        self.send(
            TransportRequest::new(Method::POST, BUCKETS_PATH)
                .with_body(json!({"data": {"id": name}}))
                .expecting(CREATED_OR_EXISTING),
        )
    }

    fn get_bucket(&self, name: &str) -> KintoResult<KintoResponse> {
        self.send(TransportRequest::new(Method::GET, bucket_path(name)).expecting(OK))
    }

    fn list_buckets(&self) -> KintoResult<KintoResponse> {
        self.send(TransportRequest::new(Method::GET, BUCKETS_PATH).expecting(OK))
    }

    fn create_collection(&self, bucket: &str, name: &str) -> KintoResult<KintoResponse> {
        self.send(
            TransportRequest::new(Method::POST, collections_path(bucket))
                .with_body(json!({"data": {"id": name}}))
                .expecting(CREATED_OR_EXISTING),
        )
    }

    fn get_collection(&self, bucket: &str, collection: &str) -> KintoResult<KintoResponse> {
        self.send(
            TransportRequest::new(Method::GET, collection_path(bucket, collection)).expecting(OK),
        )
    }

    fn list_records(
        &self,
        bucket: &str,
        collection: &str,
        query: &[(String, String)],
    ) -> KintoResult<KintoResponse> {
        self.send(
            TransportRequest::new(Method::GET, records_path(bucket, collection))
                .with_query(query.to_vec())
                .expecting(OK),
        )
    }

    fn create_record(
        &self,
        bucket: &str,
        collection: &str,
        data: Map<String, JsonValue>,
    ) -> KintoResult<KintoResponse> {
        self.send(
            TransportRequest::new(Method::POST, records_path(bucket, collection))
                .with_body(json!({ "data": data }))
                .expecting(CREATED),
        )
    }

    fn get_record(&self, bucket: &str, collection: &str, id: &str) -> KintoResult<KintoResponse> {
        self.send(
            TransportRequest::new(Method::GET, record_path(bucket, collection, id)).expecting(OK),
        )
    }

    fn update_record(
        &self,
        bucket: &str,
        collection: &str,
        id: &str,
        data: Map<String, JsonValue>,
    ) -> KintoResult<KintoResponse> {
        self.send(
            TransportRequest::new(Method::PUT, record_path(bucket, collection, id))
                .with_body(json!({ "data": data }))
                .expecting(OK),
        )
    }

    fn delete_record(
        &self,
        bucket: &str,
        collection: &str,
        id: &str,
    ) -> KintoResult<KintoResponse> {
        self.send(
            TransportRequest::new(Method::DELETE, record_path(bucket, collection, id))
                .expecting(OK),
        )
    }

    fn batch(&self, operations: Vec<Operation>) -> KintoResult<BatchResponse> {
        let body = self.transport.request(
            TransportRequest::new(Method::POST, BATCH_PATH)
                .with_body(json!({ "requests": operations }))
                .expecting(OK),
        )?;
        serde_json::from_value(body)
            .map_err(|err| decode_error(format!("Invalid batch response: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::OperationMethod;
    use crate::test_support::start_mock_server;
    use httpmock::prelude::*;

    fn client_for(server: &httpmock::MockServer) -> KintoClient {
        let transport = HttpTransport::builder(server.url("/v1"))
            .with_token("s3cret")
            .build()
            .unwrap();
        KintoClient::new(transport)
    }

    #[test]
    fn create_bucket_accepts_existing_bucket() {
        let server = start_mock_server();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/buckets")
                .json_body(json!({"data": {"id": "blog"}}));
            then.status(200)
                .json_body(json!({"data": {"id": "blog", "last_modified": 10}}));
        });

        let client = client_for(&server);
        let response = client.create_bucket("blog").unwrap();

        mock.assert();
        assert_eq!(response.data_object().unwrap()["id"], json!("blog"));
    }

    #[test]
    fn create_collection_posts_to_bucket() {
        let server = start_mock_server();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/buckets/blog/collections")
                .json_body(json!({"data": {"id": "posts"}}));
            then.status(201).json_body(json!({"data": {"id": "posts"}}));
        });

        client_for(&server).create_collection("blog", "posts").unwrap();
        mock.assert();
    }

    #[test]
    fn update_record_replaces_with_put() {
        let server = start_mock_server();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/v1/buckets/blog/collections/posts/records/abc")
                .json_body(json!({"data": {"title": "Edited"}}));
            then.status(200)
                .json_body(json!({"data": {"id": "abc", "last_modified": 2, "title": "Edited"}}));
        });

        let mut data = Map::new();
        data.insert("title".to_string(), json!("Edited"));
        let response = client_for(&server)
            .update_record("blog", "posts", "abc", data)
            .unwrap();

        mock.assert();
        assert_eq!(response.data_object().unwrap()["last_modified"], json!(2));
    }

    #[test]
    fn delete_record_sends_no_body() {
        let server = start_mock_server();
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/v1/buckets/blog/collections/posts/records/abc")
                .body("");
            then.status(200)
                .json_body(json!({"data": {"id": "abc", "last_modified": 3, "deleted": true}}));
        });

        let response = client_for(&server)
            .delete_record("blog", "posts", "abc")
            .unwrap();

        mock.assert();
        assert_eq!(response.data_object().unwrap()["deleted"], json!(true));
    }

    #[test]
    fn record_ids_are_never_read_as_url_syntax() {
        let server = start_mock_server();
        let truncated = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/buckets/blog/collections/posts/records/r1")
                .query_param("_limit", "1");
            then.status(200).json_body(json!({"data": [{"id": "other"}]}));
        });
        let escaped = server.mock(|when, then| {
            when.method(GET)
                .path_contains("/v1/buckets/blog/collections/posts/records/r1");
            then.status(404).json_body(json!({"message": "Record not found"}));
        });

        let err = client_for(&server)
            .get_record("blog", "posts", "r1?_limit=1")
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        truncated.assert_hits(0);
        escaped.assert_hits(1);
    }

    #[test]
    fn batch_wraps_operations_in_requests() {
        let server = start_mock_server();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/batch").json_body(json!({
                "requests": [{
                    "method": "POST",
                    "path": "/buckets/blog/collections/posts/records",
                    "body": {"data": {"title": "First!"}}
                }]
            }));
            then.status(200).json_body(json!({
                "responses": [{
                    "status": 201,
                    "path": "/v1/buckets/blog/collections/posts/records",
                    "body": {"data": {"id": "abc", "last_modified": 1, "title": "First!"}},
                    "headers": {"Content-Type": "application/json"}
                }]
            }));
        });

        let operations = vec![Operation {
            method: OperationMethod::Post,
            path: "/buckets/blog/collections/posts/records".to_string(),
            body: Some(json!({"data": {"title": "First!"}})),
        }];
        let response = client_for(&server).batch(operations).unwrap();

        mock.assert();
        assert_eq!(response.len(), 1);
        assert_eq!(response.responses[0].status, 201);
        assert_eq!(response.responses[0].data().unwrap()["id"], json!("abc"));
    }

    #[test]
    fn healthcheck_decodes_backend_flags() {
        let server = start_mock_server();
        server.mock(|when, then| {
            when.method(GET).path("/v1/__heartbeat__");
            then.status(200)
                .json_body(json!({"permission": true, "storage": true, "cache": true}));
        });

        let health = client_for(&server).healthcheck().unwrap();
        assert_eq!(health.storage, Some(true));
        assert!(health.is_healthy());
    }

    #[test]
    fn info_reads_server_root() {
        let server = start_mock_server();
        server.mock(|when, then| {
            when.method(GET).path("/v1/");
            then.status(200)
                .json_body(json!({"project_name": "kinto", "http_api_version": "1.22"}));
        });

        let info = client_for(&server).info().unwrap();
        assert_eq!(info.get("project_name"), Some(&json!("kinto")));
    }
}
