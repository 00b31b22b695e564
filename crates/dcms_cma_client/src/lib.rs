//! Minimal read-only JSON:API client for the DatoCMS CMA's `item-types`,
//! `fields`, and `site` resources.
//!
//! The CMA client is treated as opaque for arbitrary method invocation, but
//! the schema generator and `schema_info` both need to
//! prefetch every model and field in a project; §C.3 resolves that by
//! reading those three resources directly over HTTP rather than
//! round-tripping through the Node-side client for every read.

mod client;
mod error;
mod model;

pub use client::CmaClient;
pub use error::{ApiError, ApiErrorDetail, CmaError, RequestInfo, ResponseInfo};
pub use model::{Field, ItemType, ItemTypeWithFields, Site};
