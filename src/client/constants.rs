use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

pub const KINTO_URL_ENV: &str = "KINTO_URL";
pub const KINTO_TOKEN_ENV: &str = "KINTO_TOKEN";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creating a bucket or collection that already exists answers 200 instead of 201.
pub const CREATED_OR_EXISTING: &[u16] = &[200, 201];
pub const CREATED: &[u16] = &[201];
pub const OK: &[u16] = &[200];

pub const HEARTBEAT_PATH: &str = "/__heartbeat__";
pub const BATCH_PATH: &str = "/batch";
pub const BUCKETS_PATH: &str = "/buckets";

/// Characters escaped inside a single path segment, so ids never read as URL syntax.
pub const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

pub fn bucket_path(bucket: &str) -> String {
    format!("{BUCKETS_PATH}/{}", segment(bucket))
}

pub fn collections_path(bucket: &str) -> String {
    format!("{}/collections", bucket_path(bucket))
}

pub fn collection_path(bucket: &str, collection: &str) -> String {
    format!("{}/{}", collections_path(bucket), segment(collection))
}

pub fn records_path(bucket: &str, collection: &str) -> String {
    format!("{}/records", collection_path(bucket, collection))
}

pub fn record_path(bucket: &str, collection: &str, id: &str) -> String {
    format!("{}/{}", records_path(bucket, collection), segment(id))
}
