//! Executing `HttpRequest` values.
//!
//! `Transport` is the only seam that touches the network. It must hand back
//! every HTTP status as an `HttpResponse` and reserve `TransportError` for
//! calls that produced no response at all, so classification stays in one
//! place.

use std::io::ErrorKind as IoErrorKind;
use std::time::Instant;

use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

use crate::error::{TransportError, TransportErrorKind};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round trip.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    fn send(&self, request: &HttpRequest) -> Result<Response<Body>, ureq::Error> {
        let url = request.url.as_str();
        match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, None) => prepare(self.agent.get(url), request).call(),
            (HttpMethod::Get, Some(body)) => {
                prepare(self.agent.get(url).force_send_body(), request).send(body.as_bytes())
            }
            (HttpMethod::Delete, None) => prepare(self.agent.delete(url), request).call(),
            (HttpMethod::Delete, Some(body)) => {
                prepare(self.agent.delete(url).force_send_body(), request).send(body.as_bytes())
            }
            (HttpMethod::Post, Some(body)) => prepare(self.agent.post(url), request).send(body.as_bytes()),
            (HttpMethod::Post, None) => prepare(self.agent.post(url), request).send_empty(),
            (HttpMethod::Patch, Some(body)) => prepare(self.agent.patch(url), request).send(body.as_bytes()),
            (HttpMethod::Patch, None) => prepare(self.agent.patch(url), request).send_empty(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let start = Instant::now();
        let mut response = self.send(request).map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(transport_error)?;

        log::debug!(
            "[HTTP] {} {} -> {} in {:?}",
            request.method,
            request.url,
            status,
            start.elapsed()
        );
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Apply the timeout budget and headers to a ureq request.
fn prepare<B>(builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    let mut builder = builder
        .config()
        .http_status_as_error(false)
        .timeout_recv_response(Some(request.timeout.response))
        .timeout_global(Some(request.timeout.deadline))
        .build();
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn transport_error(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::ConnectionFailed => TransportErrorKind::ConnectionRefused,
        ureq::Error::Io(io) => match io.kind() {
            IoErrorKind::ConnectionRefused => TransportErrorKind::ConnectionRefused,
            IoErrorKind::ConnectionReset | IoErrorKind::ConnectionAborted => {
                TransportErrorKind::ConnectionReset
            }
            IoErrorKind::TimedOut => TransportErrorKind::Timeout,
            _ => TransportErrorKind::Other,
        },
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_errors_map_to_transport_kinds() {
        let refused = transport_error(ureq::Error::Io(io::Error::from(IoErrorKind::ConnectionRefused)));
        assert_eq!(refused.kind, TransportErrorKind::ConnectionRefused);

        let reset = transport_error(ureq::Error::Io(io::Error::from(IoErrorKind::ConnectionReset)));
        assert_eq!(reset.kind, TransportErrorKind::ConnectionReset);

        let timed_out = transport_error(ureq::Error::Io(io::Error::from(IoErrorKind::TimedOut)));
        assert_eq!(timed_out.kind, TransportErrorKind::Timeout);

        let other = transport_error(ureq::Error::Io(io::Error::from(IoErrorKind::PermissionDenied)));
        assert_eq!(other.kind, TransportErrorKind::Other);
    }

    #[test]
    fn connection_failed_counts_as_refused() {
        assert_eq!(
            transport_error(ureq::Error::ConnectionFailed).kind,
            TransportErrorKind::ConnectionRefused
        );
    }
}
