//! # Query
//!
//! Read access to a single collection. [`Query::get`] fetches one record, a set of
//! records by id, or the first `n` records; [`Query::filter`] translates a
//! [`QuerySpec`] into Kinto's listing parameters.
//!
//! ```
//! use kinto_rs_sdk::query::QuerySpec;
//!
//! let mut spec = QuerySpec::new()
//!     .fields(["text", "character"])
//!     .limit(10)
//!     .param("min_season", 10)
//!     .sort("-episode");
//!
//! let params = spec.render().unwrap();
//! assert_eq!(params[0], ("_fields".to_string(), "text,character".to_string()));
//! assert_eq!(spec.len(), 1);
//! ```

mod api;
mod spec;

#[doc(inline)]
pub use api::{GetOptions, Query};
#[doc(inline)]
pub use spec::QuerySpec;
