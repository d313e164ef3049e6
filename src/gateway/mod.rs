//! # Gateway
//!
//! Orchestration facade between [`KintoModel`](crate::model::KintoModel) values and a
//! [`ResourceClient`](crate::client::ResourceClient).
//!
//! A record moves through `unsaved → created → updated* → deleted`. Updating or
//! deleting a model that was never created fails locally with a configuration error.
//! After a delete the model keeps its `id` and `last_modified`.
//!
//! ```no_run
//! use kinto_rs_sdk::client::KintoClient;
//! use kinto_rs_sdk::gateway::Gateway;
//! use kinto_rs_sdk::kinto_model;
//! use kinto_rs_sdk::model::{KintoModel, RecordMeta};
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
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Gateway::new(KintoClient::from_env()?);
//!     gateway.ensure_buckets([Post::config()])?;
//!     gateway.ensure_collections([Post::config()])?;
//!
//!     let mut post = Post { title: "First!".into(), body: "lame".into(), meta: RecordMeta::default() };
//!     gateway.create_record(&mut post)?;
//!     post.body = "Not so lame, now".into();
//!     gateway.update_record(&mut post)?;
//!     println!("saved {:?} at {:?}", post.id(), post.last_modified());
//!     Ok(())
//! }
//! ```

mod api;

#[doc(inline)]
pub use api::{sync_batch_results, Gateway};
