//! Request descriptors and wire DTOs for the OZmap API.
//!
//! # Design
//! Read-style calls take a descriptor struct with builder-style setters so
//! optional modifiers (select, limit, page, populate, sort, extra headers)
//! do not turn into long positional argument lists. All fields are public;
//! the setters only exist for convenience.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::http::HttpMethod;
use crate::pagination::PaginationStrategy;

/// Extra request headers, appended after `Authorization`.
pub type Headers = Vec<(String, String)>;

/// Login payload for `POST /users/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

/// Reply of `POST /users/login`; `authorization` is the new API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub authorization: String,
}

/// One list request against a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadQuery {
    pub model: String,
    pub filter: Option<Filter>,
    pub select: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub populate: Option<String>,
    pub sort: Option<Value>,
    pub extra_headers: Headers,
}

impl ReadQuery {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn populate(mut self, populate: impl Into<String>) -> Self {
        self.populate = Some(populate.into());
        self
    }

    pub fn sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }
}

/// Page size used by fetch-all when none is given.
pub const DEFAULT_PAGE_LIMIT: u32 = 500;

/// A fetch-all request: the list query plus the pagination strategy.
///
/// `strategy` falls back to the client configuration when unset.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchAllQuery {
    pub query: ReadQuery,
    pub strategy: Option<PaginationStrategy>,
}

impl FetchAllQuery {
    /// Fetch-all over `model` with the default page size of 500.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            query: ReadQuery::new(model).limit(DEFAULT_PAGE_LIMIT),
            strategy: None,
        }
    }

    pub fn strategy(mut self, strategy: PaginationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Adjust the underlying list query (filter, select, limit...).
    pub fn with_query(mut self, f: impl FnOnce(ReadQuery) -> ReadQuery) -> Self {
        self.query = f(self.query);
        self
    }
}

impl From<ReadQuery> for FetchAllQuery {
    fn from(mut query: ReadQuery) -> Self {
        query.limit.get_or_insert(DEFAULT_PAGE_LIMIT);
        Self {
            query,
            strategy: None,
        }
    }
}

/// An arbitrary call under `/api/v2`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRequest {
    pub method: HttpMethod,
    pub route: String,
    pub query: Vec<(String, String)>,
    pub data: Option<Value>,
    pub extra_headers: Headers,
}

impl CustomRequest {
    pub fn new(method: HttpMethod, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            query: Vec::new(),
            data: None,
            extra_headers: Vec::new(),
        }
    }

    pub fn get(route: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, route)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// The login route stays live in dry-run mode.
    pub fn is_login(&self) -> bool {
        self.route.trim_matches('/') == "users/login"
    }
}

/// Output format of the render endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Pdf,
    Svg,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "pdf" => Ok(ExportFormat::Pdf),
            "svg" => Ok(ExportFormat::Svg),
            other => Err(Error::Configuration(format!("unsupported export format: {other}"))),
        }
    }
}
