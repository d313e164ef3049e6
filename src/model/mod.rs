//! # Model declaration
//!
//! A model is any serializable type that knows where its records live. The storage
//! coordinates are declared once per type through [`KintoModel::config`]; each instance
//! carries only its field values and the server-assigned [`RecordMeta`].
//!
//! ```
//! use kinto_rs_sdk::kinto_model;
//! use kinto_rs_sdk::model::{to_operation, KintoModel, RecordMeta};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Post {
//!     title: String,
//!     body: String,
//!     #[serde(skip)]
//!     meta: RecordMeta,
//! }
//!
//! kinto_model!(Post, bucket = "blog", collection = "posts", meta = meta);
//!
//! let post = Post { title: "First!".into(), body: "lame".into(), meta: RecordMeta::default() };
//! let operation = to_operation(&post).unwrap();
//! assert_eq!(operation.path, "/buckets/blog/collections/posts/records");
//! assert!(post.id().is_none());
//! ```

mod operation;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::client::constants::records_path;
use crate::client::error::{configuration_error, decode_error, KintoResult};

#[doc(inline)]
pub use operation::{to_crud_payload, to_operation, CrudPayload};

/// Field names owned by the server, never sent as part of a record's data.
pub const SERVER_ASSIGNED_FIELDS: [&str; 2] = ["id", "last_modified"];

/// Storage coordinates shared by every instance of a model type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelConfig {
    bucket: String,
    collection: String,
}

impl ModelConfig {
    pub fn new(bucket: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            collection: collection.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Fails with a configuration error when the bucket or collection is unset.
    pub fn validate(&self) -> KintoResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(configuration_error(format!(
                "Model bound to collection `{}` does not declare a bucket",
                self.collection
            )));
        }
        if self.collection.trim().is_empty() {
            return Err(configuration_error(format!(
                "Model bound to bucket `{}` does not declare a collection",
                self.bucket
            )));
        }
        Ok(())
    }

    pub fn records_path(&self) -> String {
        records_path(&self.bucket, &self.collection)
    }
}

/// Server-assigned identity of a stored record.
///
/// `last_modified` is kept exactly as the server sent it. Models may either
/// `#[serde(skip)]` this field or `#[serde(flatten)]` it; [`KintoModel::fields`] strips
/// the server-assigned keys in both cases.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<JsonValue>,
}

impl RecordMeta {
    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn clear(&mut self) {
        self.id = None;
        self.last_modified = None;
    }

    /// Overwrites both fields from a record's `data` object.
    pub(crate) fn apply(&mut self, data: &Map<String, JsonValue>) -> KintoResult<()> {
        let id = data
            .get("id")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| decode_error("Record data is missing a string `id`"))?;
        self.id = Some(id.to_owned());
        self.last_modified = data.get("last_modified").cloned();
        Ok(())
    }
}

/// A data type stored as Kinto records.
///
/// Implementors supply the type-level coordinates and access to their [`RecordMeta`];
/// the serialized field set defaults to the type's `serde` representation. Use
/// `#[serde(skip)]` on the meta field, or rely on `id`/`last_modified` being stripped.
pub trait KintoModel: Serialize {
    fn config() -> ModelConfig;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    fn fields(&self) -> KintoResult<Map<String, JsonValue>> {
        let value = serde_json::to_value(self).map_err(|err| {
            configuration_error(format!("Model could not be serialized: {err}"))
        })?;
        let JsonValue::Object(mut fields) = value else {
            return Err(configuration_error(
                "Model must serialize to a JSON object of fields",
            ));
        };
        for name in SERVER_ASSIGNED_FIELDS {
            fields.remove(name);
        }
        Ok(fields)
    }

    fn id(&self) -> Option<&str> {
        self.meta().id.as_deref()
    }

    fn last_modified(&self) -> Option<&JsonValue> {
        self.meta().last_modified.as_ref()
    }
}

/// Implements [`KintoModel`] for a struct holding a [`RecordMeta`] field.
///
/// ```ignore
/// kinto_model!(Line, bucket = "southpark", collection = "scripts", meta = meta);
/// ```
#[macro_export]
macro_rules! kinto_model {
    ($ty:ty, bucket = $bucket:expr, collection = $collection:expr, meta = $field:ident) => {
        impl $crate::model::KintoModel for $ty {
            fn config() -> $crate::model::ModelConfig {
                $crate::model::ModelConfig::new($bucket, $collection)
            }

            fn meta(&self) -> &$crate::model::RecordMeta {
                &self.$field
            }

            fn meta_mut(&mut self) -> &mut $crate::model::RecordMeta {
                &mut self.$field
            }
        }
    };
}
