//! Stateless request builder for the OZmap `/api/v2` surface.
//!
//! # Design
//! `RequestFactory` holds only the base URL, the filter mode and the timeout
//! budgets. Each operation has a `build_*` method producing an `HttpRequest`;
//! nothing here performs I/O, so URL layout and filter placement can be
//! checked directly. The API key is passed per call because it may be
//! refreshed between requests.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::Result;
use crate::filter::{self, Filter, FilterMode, URI_COMPONENT};
use crate::http::{HttpMethod, HttpRequest, TimeoutBudget};
use crate::types::{Credentials, CustomRequest, ExportFormat, Headers, ReadQuery};

/// Characters that cannot appear raw in a query string. `%`, `&`, `=` and
/// `+` pass through, so this is only for the `filter` parameter, whose
/// values arrive already percent-encoded.
const QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'[')
    .add(b']');

const API_PREFIX: &str = "/api/v2";

/// Builds `HttpRequest` values for every OZmap call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFactory {
    base_url: String,
    filter_mode: FilterMode,
    timeout: TimeoutBudget,
    export_timeout: TimeoutBudget,
}

impl RequestFactory {
    pub fn new(base_url: &str, filter_mode: FilterMode) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            filter_mode,
            timeout: TimeoutBudget::STANDARD,
            export_timeout: TimeoutBudget::EXPORT,
        }
    }

    /// Factory for `base_url` using the filter mode and budgets of `config`.
    pub fn from_config(base_url: &str, config: &Config) -> Self {
        Self {
            timeout: config.timeout,
            export_timeout: config.export_timeout,
            ..Self::new(base_url, config.filter_mode)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn build_authenticated(&self, key: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, self.api_url("authenticated"), key, &[], None)
    }

    /// Login sends no `Authorization` header.
    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest> {
        let body = serde_json::to_string(credentials)?;
        Ok(self.request(HttpMethod::Post, self.api_url("users/login"), None, &[], Some(body)))
    }

    pub fn build_create(&self, key: Option<&str>, model: &str, data: &Value) -> Result<HttpRequest> {
        let body = serde_json::to_string(data)?;
        Ok(self.request(HttpMethod::Post, self.api_url(model), key, &[], Some(body)))
    }

    pub fn build_update(
        &self,
        key: Option<&str>,
        model: &str,
        id: &str,
        data: &Value,
        extra_headers: &[(String, String)],
    ) -> Result<HttpRequest> {
        let body = serde_json::to_string(data)?;
        let url = self.api_url(&format!("{model}/{id}"));
        Ok(self.request(HttpMethod::Patch, url, key, extra_headers, Some(body)))
    }

    pub fn build_delete(
        &self,
        key: Option<&str>,
        model: &str,
        id: &str,
        extra_headers: &[(String, String)],
    ) -> HttpRequest {
        let url = self.api_url(&format!("{model}/{id}"));
        self.request(HttpMethod::Delete, url, key, extra_headers, None)
    }

    /// List request. In body mode the filter travels as `{"filter": ...}`;
    /// in URL mode it becomes the `filter` query parameter and no body is sent.
    pub fn build_read(&self, key: Option<&str>, query: &ReadQuery) -> Result<HttpRequest> {
        let mut params = QueryParams::default();
        let mut body = None;

        match self.filter_mode {
            FilterMode::Url => {
                if let Some(encoded) = filter::url_parameter(query.filter.as_ref())? {
                    params.push_encoded("filter", &encoded);
                }
            }
            FilterMode::Body => {
                body = Some(serde_json::to_string(&filter::body(query.filter.as_ref()))?);
            }
        }

        if let Some(select) = &query.select {
            params.push("select", select);
        }
        if let Some(limit) = query.limit {
            params.push("limit", &limit.to_string());
        }
        if let Some(populate) = &query.populate {
            params.push("populate", populate);
        }
        if let Some(page) = query.page {
            params.push("page", &page.to_string());
        }
        if let Some(sort) = &query.sort {
            params.push("sort", &serde_json::to_string(sort)?);
        }

        let url = params.append_to(self.api_url(&query.model));
        Ok(self.request(HttpMethod::Get, url, key, &query.extra_headers, body))
    }

    pub fn build_read_by_id(
        &self,
        key: Option<&str>,
        model: &str,
        id: &str,
        select: Option<&str>,
        extra_headers: &[(String, String)],
    ) -> HttpRequest {
        let mut params = QueryParams::default();
        if let Some(select) = select {
            params.push("select", select);
        }
        let url = params.append_to(self.api_url(&format!("{model}/{id}")));
        self.request(HttpMethod::Get, url, key, extra_headers, None)
    }

    /// Follow a server-provided `nextUrl`, re-sending the filter in the body.
    pub fn build_next_page(
        &self,
        key: Option<&str>,
        next_url: &str,
        filter: Option<&Filter>,
        extra_headers: &[(String, String)],
    ) -> Result<HttpRequest> {
        let url = if next_url.starts_with("http://") || next_url.starts_with("https://") {
            next_url.to_string()
        } else {
            format!("{}{}", self.base_url, next_url)
        };
        let body = serde_json::to_string(&filter::body(filter))?;
        Ok(self.request(HttpMethod::Get, url, key, extra_headers, Some(body)))
    }

    pub fn build_custom(&self, key: Option<&str>, custom: &CustomRequest) -> Result<HttpRequest> {
        let mut params = QueryParams::default();
        for (name, value) in &custom.query {
            params.push(name, value);
        }
        let url = params.append_to(self.api_url(&custom.route));
        let body = custom.data.as_ref().map(serde_json::to_string).transpose()?;
        Ok(self.request(custom.method, url, key, &custom.extra_headers, body))
    }

    pub fn build_export_croqui(
        &self,
        key: Option<&str>,
        property_id: &str,
        format: ExportFormat,
    ) -> HttpRequest {
        let url = self.api_url(&format!("render/croqui/{property_id}/{format}"));
        HttpRequest {
            timeout: self.export_timeout,
            ..self.request(HttpMethod::Get, url, key, &[], None)
        }
    }

    /// Box diagram export; fibers listed in `highlight` are emphasized and
    /// numbered.
    pub fn build_export_box(
        &self,
        key: Option<&str>,
        box_id: &str,
        highlight: &[String],
        format: ExportFormat,
    ) -> Result<HttpRequest> {
        let url = self.api_url(&format!("render/box/{box_id}/{format}"));
        let body = serde_json::to_string(&json!({
            "highlight": highlight,
            "exhibition": {
                "icon": "fas fa-list-ol",
                "name": "number",
                "tooltip": "Número da fibra"
            }
        }))?;
        Ok(HttpRequest {
            timeout: self.export_timeout,
            ..self.request(HttpMethod::Post, url, key, &[], Some(body))
        })
    }

    fn api_url(&self, route: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, route.trim_start_matches('/'))
    }

    fn request(
        &self,
        method: HttpMethod,
        url: String,
        key: Option<&str>,
        extra_headers: &[(String, String)],
        body: Option<String>,
    ) -> HttpRequest {
        let mut headers: Headers = Vec::new();
        if let Some(key) = key {
            headers.push(("Authorization".to_string(), key.to_string()));
        }
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        // Extra headers win over the defaults, as with an object spread.
        headers.retain(|(name, _)| {
            !extra_headers
                .iter()
                .any(|(extra, _)| extra.eq_ignore_ascii_case(name))
        });
        headers.extend(extra_headers.iter().cloned());

        HttpRequest {
            method,
            url,
            headers,
            body,
            timeout: self.timeout,
        }
    }
}

/// Ordered `name=value` pairs for a query string.
#[derive(Debug, Default)]
struct QueryParams(Vec<String>);

impl QueryParams {
    fn push(&mut self, name: &str, value: &str) {
        self.0.push(format!(
            "{}={}",
            utf8_percent_encode(name, URI_COMPONENT),
            utf8_percent_encode(value, URI_COMPONENT)
        ));
    }

    /// `value` already has its reserved characters escaped; only make it
    /// URL-safe.
    fn push_encoded(&mut self, name: &str, value: &str) {
        self.0.push(format!("{name}={}", utf8_percent_encode(value, QUERY)));
    }

    fn append_to(self, url: String) -> String {
        if self.0.is_empty() {
            url
        } else {
            format!("{url}?{}", self.0.join("&"))
        }
    }
}
