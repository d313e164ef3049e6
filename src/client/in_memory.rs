use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use percent_encoding::percent_decode_str;
use serde_json::{json, Map, Value as JsonValue};

use crate::client::api::ResourceClient;
use crate::client::error::{invalid_argument, unexpected_status, KintoResult};
use crate::client::types::{BatchResponse, BatchSubResponse, KintoResponse, Operation, OperationMethod};

/// A call received by [`InMemoryClient`], in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCall {
    CreateBucket(String),
    GetBucket(String),
    ListBuckets,
    CreateCollection {
        bucket: String,
        name: String,
    },
    GetCollection {
        bucket: String,
        collection: String,
    },
    ListRecords {
        bucket: String,
        collection: String,
        query: Vec<(String, String)>,
    },
    CreateRecord {
        bucket: String,
        collection: String,
        data: Map<String, JsonValue>,
    },
    GetRecord {
        bucket: String,
        collection: String,
        id: String,
    },
    UpdateRecord {
        bucket: String,
        collection: String,
        id: String,
        data: Map<String, JsonValue>,
    },
    DeleteRecord {
        bucket: String,
        collection: String,
        id: String,
    },
    Batch(Vec<Operation>),
}

/// Resource client keeping buckets, collections and records in process memory.
///
/// Mimics the server's observable replies (generated ids, increasing `last_modified`,
/// 403 for unknown containers, 404 for unknown records) and logs every call, which makes
/// it suitable for tests and offline runs.
#[derive(Clone, Debug, Default)]
pub struct InMemoryClient {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<RecordedCall>,
    buckets: BTreeSet<String>,
    collections: BTreeSet<(String, String)>,
    records: BTreeMap<(String, String), BTreeMap<String, Map<String, JsonValue>>>,
    next_id: u64,
    clock: u64,
    rejected_batch_items: BTreeSet<usize>,
}

impl State {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn generate_id(&mut self) -> String {
        self.next_id += 1;
        format!("record-{:04}", self.next_id)
    }

    fn ensure_collection(&self, bucket: &str, collection: &str) -> KintoResult<()> {
        if self
            .collections
            .contains(&(bucket.to_owned(), collection.to_owned()))
        {
            Ok(())
        } else {
            Err(unexpected_status(
                403,
                format!("Collection `{bucket}/{collection}` does not exist"),
            ))
        }
    }

    fn insert_record(
        &mut self,
        bucket: &str,
        collection: &str,
        id: String,
        mut data: Map<String, JsonValue>,
    ) -> Map<String, JsonValue> {
        let last_modified = self.tick();
        data.insert("id".to_string(), JsonValue::String(id.clone()));
        data.insert("last_modified".to_string(), json!(last_modified));
        self.records
            .entry((bucket.to_owned(), collection.to_owned()))
            .or_default()
            .insert(id, data.clone());
        data
    }

    fn batch_item(&mut self, operation: &Operation) -> BatchSubResponse {
        let path = format!("/v1{}", operation.path);
        let Some((bucket, collection)) = parse_records_path(&operation.path) else {
            return sub_response(404, path, json!({"message": "Unknown path"}));
        };
        if operation.method != OperationMethod::Post {
            return sub_response(405, path, json!({"message": "Method not allowed"}));
        }
        if self.ensure_collection(&bucket, &collection).is_err() {
            return sub_response(403, path, json!({"message": "Unknown collection"}));
        }

        let data = operation
            .body
            .as_ref()
            .and_then(|body| body.get("data"))
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();
        let id = self.generate_id();
        let stored = self.insert_record(&bucket, &collection, id, data);
        sub_response(201, path, json!({ "data": stored }))
    }
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the batch sub-response at `index` fail with status 400.
    pub fn reject_batch_item(&self, index: usize) {
        self.state.lock().unwrap().rejected_batch_items.insert(index);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn record_count(&self, bucket: &str, collection: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&(bucket.to_owned(), collection.to_owned()))
            .map_or(0, BTreeMap::len)
    }

    fn record_call(&self, call: RecordedCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl ResourceClient for InMemoryClient {
    fn create_bucket(&self, name: &str) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::CreateBucket(name.to_owned()));
        let mut state = self.state.lock().unwrap();
        state.buckets.insert(name.to_owned());
        let last_modified = state.tick();
        response(json!({"data": {"id": name, "last_modified": last_modified}}))
    }

    fn get_bucket(&self, name: &str) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::GetBucket(name.to_owned()));
        let state = self.state.lock().unwrap();
        if !state.buckets.contains(name) {
            return Err(unexpected_status(403, format!("Bucket `{name}` does not exist")));
        }
        response(json!({"data": {"id": name}}))
    }

    fn list_buckets(&self) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::ListBuckets);
        let state = self.state.lock().unwrap();
        let buckets: Vec<JsonValue> = state
            .buckets
            .iter()
            .map(|name| json!({"id": name}))
            .collect();
        response(json!({ "data": buckets }))
    }

    fn create_collection(&self, bucket: &str, name: &str) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::CreateCollection {
            bucket: bucket.to_owned(),
            name: name.to_owned(),
        });
        let mut state = self.state.lock().unwrap();
        if !state.buckets.contains(bucket) {
            return Err(unexpected_status(403, format!("Bucket `{bucket}` does not exist")));
        }
        state
            .collections
            .insert((bucket.to_owned(), name.to_owned()));
        let last_modified = state.tick();
        response(json!({"data": {"id": name, "last_modified": last_modified}}))
    }

    fn get_collection(&self, bucket: &str, collection: &str) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::GetCollection {
            bucket: bucket.to_owned(),
            collection: collection.to_owned(),
        });
        let state = self.state.lock().unwrap();
        state.ensure_collection(bucket, collection)?;
        response(json!({"data": {"id": collection}}))
    }

    fn list_records(
        &self,
        bucket: &str,
        collection: &str,
        query: &[(String, String)],
    ) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::ListRecords {
            bucket: bucket.to_owned(),
            collection: collection.to_owned(),
            query: query.to_vec(),
        });
        let state = self.state.lock().unwrap();
        state.ensure_collection(bucket, collection)?;

        let ids: Option<BTreeSet<&str>> = query
            .iter()
            .find(|(key, _)| key == "in_id")
            .map(|(_, value)| value.split(',').collect());
        let limit = match query.iter().find(|(key, _)| key == "_limit") {
            Some((_, value)) => value
                .parse::<usize>()
                .map_err(|_| invalid_argument(format!("Invalid _limit `{value}`")))?,
            None => usize::MAX,
        };

        let records: Vec<JsonValue> = state
            .records
            .get(&(bucket.to_owned(), collection.to_owned()))
            .into_iter()
            .flat_map(BTreeMap::iter)
            .filter(|(id, _)| ids.as_ref().map_or(true, |ids| ids.contains(id.as_str())))
            .take(limit)
            .map(|(_, data)| JsonValue::Object(data.clone()))
            .collect();
        response(json!({ "data": records }))
    }

    fn create_record(
        &self,
        bucket: &str,
        collection: &str,
        data: Map<String, JsonValue>,
    ) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::CreateRecord {
            bucket: bucket.to_owned(),
            collection: collection.to_owned(),
            data: data.clone(),
        });
        let mut state = self.state.lock().unwrap();
        state.ensure_collection(bucket, collection)?;
        let id = state.generate_id();
        let stored = state.insert_record(bucket, collection, id, data);
        response(json!({ "data": stored }))
    }

    fn get_record(&self, bucket: &str, collection: &str, id: &str) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::GetRecord {
            bucket: bucket.to_owned(),
            collection: collection.to_owned(),
            id: id.to_owned(),
        });
        let state = self.state.lock().unwrap();
        state.ensure_collection(bucket, collection)?;
        let record = state
            .records
            .get(&(bucket.to_owned(), collection.to_owned()))
            .and_then(|records| records.get(id))
            .ok_or_else(|| unexpected_status(404, format!("Record `{id}` not found")))?;
        response(json!({ "data": record }))
    }

    fn update_record(
        &self,
        bucket: &str,
        collection: &str,
        id: &str,
        data: Map<String, JsonValue>,
    ) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::UpdateRecord {
            bucket: bucket.to_owned(),
            collection: collection.to_owned(),
            id: id.to_owned(),
            data: data.clone(),
        });
        let mut state = self.state.lock().unwrap();
        state.ensure_collection(bucket, collection)?;
        let stored = state.insert_record(bucket, collection, id.to_owned(), data);
        response(json!({ "data": stored }))
    }

    fn delete_record(
        &self,
        bucket: &str,
        collection: &str,
        id: &str,
    ) -> KintoResult<KintoResponse> {
        self.record_call(RecordedCall::DeleteRecord {
            bucket: bucket.to_owned(),
            collection: collection.to_owned(),
            id: id.to_owned(),
        });
        let mut state = self.state.lock().unwrap();
        state.ensure_collection(bucket, collection)?;
        let removed = state
            .records
            .get_mut(&(bucket.to_owned(), collection.to_owned()))
            .and_then(|records| records.remove(id));
        if removed.is_none() {
            return Err(unexpected_status(404, format!("Record `{id}` not found")));
        }
        let last_modified = state.tick();
        response(json!({"data": {"id": id, "last_modified": last_modified, "deleted": true}}))
    }

    fn batch(&self, operations: Vec<Operation>) -> KintoResult<BatchResponse> {
        self.record_call(RecordedCall::Batch(operations.clone()));
        let mut state = self.state.lock().unwrap();
        let responses = operations
            .iter()
            .enumerate()
            .map(|(index, operation)| {
                if state.rejected_batch_items.contains(&index) {
                    sub_response(
                        400,
                        format!("/v1{}", operation.path),
                        json!({"message": "Invalid record"}),
                    )
                } else {
                    state.batch_item(operation)
                }
            })
            .collect();
        Ok(BatchResponse { responses })
    }
}

fn response(value: JsonValue) -> KintoResult<KintoResponse> {
    KintoResponse::from_value(value)
}

fn sub_response(status: u16, path: String, body: JsonValue) -> BatchSubResponse {
    BatchSubResponse {
        status,
        path,
        body,
        headers: BTreeMap::new(),
    }
}

fn parse_records_path(path: &str) -> Option<(String, String)> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["buckets", bucket, "collections", collection, "records"] => Some((
            percent_decode_str(bucket).decode_utf8().ok()?.into_owned(),
            percent_decode_str(collection).decode_utf8().ok()?.into_owned(),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recreating_a_bucket_is_harmless() {
        let client = InMemoryClient::new();
        client.create_bucket("blog").unwrap();
        client.create_bucket("blog").unwrap();

        assert_eq!(client.list_buckets().unwrap().data_list().unwrap().len(), 1);
        assert_eq!(client.call_count(), 3);
    }

    #[test]
    fn records_require_an_existing_collection() {
        let client = InMemoryClient::new();
        let err = client
            .create_record("blog", "posts", Map::new())
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn created_records_get_ids_and_revisions() {
        let client = InMemoryClient::new();
        client.create_bucket("blog").unwrap();
        client.create_collection("blog", "posts").unwrap();

        let mut data = Map::new();
        data.insert("title".to_string(), json!("First!"));
        let created = client.create_record("blog", "posts", data).unwrap();
        let created = created.data_object().unwrap();

        assert_eq!(created["id"], json!("record-0001"));
        assert!(created["last_modified"].is_u64());
        assert_eq!(client.record_count("blog", "posts"), 1);

        client.delete_record("blog", "posts", "record-0001").unwrap();
        assert_eq!(client.record_count("blog", "posts"), 0);
        assert_eq!(
            client
                .delete_record("blog", "posts", "record-0001")
                .unwrap_err()
                .status(),
            Some(404)
        );
    }

    #[test]
    fn parses_record_paths() {
        assert_eq!(
            parse_records_path("/buckets/southpark/collections/scripts/records"),
            Some(("southpark".to_string(), "scripts".to_string()))
        );
        assert_eq!(parse_records_path("/buckets/southpark"), None);
        assert_eq!(
            parse_records_path(&crate::client::constants::records_path("south park", "a/b")),
            Some(("south park".to_string(), "a/b".to_string()))
        );
    }
}
