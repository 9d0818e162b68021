//! HTTP transport types for the OZmap client.
//!
//! # Design
//! Requests and responses are plain data. `RequestFactory` builds
//! `HttpRequest` values without touching the network and a `Transport`
//! executes them, so URL construction, filter encoding and status handling
//! stay deterministic and testable on their own.
//!
//! Response bodies are kept as raw bytes because the export endpoints return
//! images; JSON endpoints decode from the same buffer.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    /// Case-insensitive, so `"get"` and `"GET"` both work for custom requests.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(Error::Configuration(format!("unsupported HTTP method: {other}"))),
        }
    }
}

/// Time limits applied to a single call.
///
/// `response` bounds the wait for the response head once the request is
/// sent; `deadline` bounds the whole exchange including the body download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget {
    pub response: Duration,
    pub deadline: Duration,
}

impl TimeoutBudget {
    /// Budget for JSON API calls: 4 minutes for the response, 30 overall.
    pub const STANDARD: TimeoutBudget = TimeoutBudget {
        response: Duration::from_secs(240),
        deadline: Duration::from_secs(1800),
    };

    /// Budget for the render/export endpoints.
    pub const EXPORT: TimeoutBudget = TimeoutBudget {
        response: Duration::from_secs(50),
        deadline: Duration::from_secs(50),
    };

    /// Same limit for the response and the overall deadline.
    pub fn uniform(limit: Duration) -> Self {
        Self {
            response: limit,
            deadline: limit,
        }
    }
}

impl Default for TimeoutBudget {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// An HTTP request described as plain data.
///
/// Built by `RequestFactory`. `body` is already serialized JSON; when it is
/// present the `content-type` header is part of `headers`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: TimeoutBudget,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Transports return every status as a response; interpreting non-2xx codes
/// is the error mapper's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON. An empty body decodes as JSON `null`, which
    /// lets `()`/`Option`/`Value` targets accept 204-style replies.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!("DELETE".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
    }

    #[test]
    fn unknown_method_is_a_configuration_error() {
        let err = "TRACE".parse::<HttpMethod>().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn export_budget_is_tighter_than_standard() {
        assert!(TimeoutBudget::EXPORT.response < TimeoutBudget::STANDARD.response);
        assert_eq!(TimeoutBudget::EXPORT.response, TimeoutBudget::EXPORT.deadline);
        assert_eq!(TimeoutBudget::default(), TimeoutBudget::STANDARD);
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let value: serde_json::Value = response(204, "").json().unwrap();
        assert!(value.is_null());
        let none: Option<u32> = response(200, "  \n").json().unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn json_body_decodes() {
        let value: serde_json::Value = response(200, r#"{"id":"abc"}"#).json().unwrap();
        assert_eq!(value["id"], "abc");
    }

    #[test]
    fn bad_json_is_a_json_error() {
        let err = response(200, "not json").json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/api/v2/boxes".to_string(),
            headers: vec![("Authorization".to_string(), "token".to_string())],
            body: None,
            timeout: TimeoutBudget::STANDARD,
        };
        assert_eq!(req.header("authorization"), Some("token"));
        assert_eq!(req.header("content-type"), None);
    }
}
