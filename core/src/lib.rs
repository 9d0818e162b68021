//! Synchronous client core for the OZmap network-inventory API.
//!
//! # Overview
//! OZmap exposes fiber-network inventory (boxes, splitters, cables, clients,
//! properties, ...) under `/api/v2`. This crate builds `HttpRequest` values,
//! executes them through a pluggable `Transport`, and turns responses and
//! failures into typed results.
//!
//! # Design
//! - `RequestFactory` is stateless: given a key and a descriptor it produces
//!   a complete request, so request shape is tested without a network.
//! - `OzmapClient` adds the mutable parts: the API key, dry-run suppression,
//!   the execution log, and fetch-all pagination.
//! - Every failure goes through `error::classify`, which maps statuses and
//!   transport errors onto a closed `ErrorKind` set with localized messages.
//! - `Filter` is a recursive enum serialized untagged, matching the wire
//!   shape of clause lists and nested groups.

pub mod client;
pub mod config;
pub mod error;
pub mod exec_log;
pub mod filter;
pub mod http;
pub mod i18n;
pub mod id_map;
pub mod models;
pub mod pagination;
pub mod request;
pub mod transport;
pub mod types;

pub use client::OzmapClient;
pub use config::Config;
pub use error::{Error, ErrorKind, OzError, Result};
pub use exec_log::ExecutionLog;
pub use filter::{Clause, Filter, FilterMode, Operator};
pub use http::{HttpMethod, HttpRequest, HttpResponse, TimeoutBudget};
pub use i18n::Locale;
pub use id_map::IdMap;
pub use models::Model;
pub use pagination::{FetchAll, Page, PaginationStrategy};
pub use request::RequestFactory;
pub use transport::{Transport, UreqTransport};
pub use types::{Credentials, CustomRequest, ExportFormat, FetchAllQuery, ReadQuery};
