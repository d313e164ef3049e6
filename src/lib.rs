#![doc = include_str!("RUSTDOC.md")]

pub mod client;
pub mod gateway;
pub mod logger;
pub mod model;
pub mod query;

pub use client::{KintoClient, KintoError, KintoErrorCode, KintoResult, ResourceClient};
pub use gateway::Gateway;
pub use model::{KintoModel, ModelConfig, RecordMeta};
pub use query::{GetOptions, Query, QuerySpec};

#[cfg(test)]
pub mod test_support;
