//! # seamicro-core
//!
//! Transport, resource and manager framework for the SeaMicro chassis REST
//! API.
//!
//! The crate turns domain calls into authenticated HTTP requests and turns
//! the chassis' heterogeneous JSON answers into typed resources. Resource
//! catalogs (servers, pools, volumes, ...) live in `seamicro-client` and are
//! thin specializations of the types here.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and HTTP status classification
//! - [`config`] - Validated client configuration
//! - [`retry`] - Fixed-delay retry policy for refused connections
//! - [`auth`] - Credentials, login markers and credential placement
//! - [`transport`] - The authenticating HTTP transport
//! - [`resource`] - Resources and resource kinds
//! - [`manager`] - Per-kind gateways and listing decoding
//! - [`filter`] - Client-side `find` / `findall` predicates
//! - [`query`] - Query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod manager;
pub mod query;
pub mod resource;
pub mod retry;
pub mod transport;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{AuthMode, ChassisConfig};
pub use error::{Error, Result};
pub use filter::{Filters, Operator, Predicate};
pub use manager::{Created, Manager};
pub use resource::{Resource, ResourceId, ResourceKind};
pub use transport::{HttpTransport, HttpTransportBuilder, RequestOptions, RequestTiming, Transport};
