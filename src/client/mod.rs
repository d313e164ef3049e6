//! # Kinto resource client
//!
//! HTTP plumbing for the Kinto REST API: a [`Transport`] seam with a blocking `reqwest`
//! implementation, and the typed [`ResourceClient`] surface over buckets, collections,
//! records and batch submission.
//!
//! ```no_run
//! use kinto_rs_sdk::client::{HttpTransport, KintoClient, ResourceClient};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::builder("http://localhost:8888/v1")
//!         .with_token("my-secret")
//!         .build()?;
//!     let client = KintoClient::new(transport);
//!
//!     client.create_bucket("blog")?;
//!     let buckets = client.list_buckets()?;
//!     println!("{:?}", buckets.data());
//!     Ok(())
//! }
//! ```

mod api;
pub mod constants;
pub mod error;
mod in_memory;
mod transport;
mod types;

#[doc(inline)]
pub use api::{KintoClient, ResourceClient};

#[doc(inline)]
pub use in_memory::{InMemoryClient, RecordedCall};

#[doc(inline)]
pub use error::{KintoError, KintoErrorCode, KintoResult};

#[doc(inline)]
pub use transport::{HttpTransport, HttpTransportBuilder, Transport, TransportRequest};

#[doc(inline)]
pub use types::{
    BatchResponse, BatchSubResponse, HealthcheckResponse, KintoResponse, Operation,
    OperationMethod,
};
