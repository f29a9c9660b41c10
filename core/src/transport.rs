//! The seam between request building and the network.
//!
//! `UreqTransport` is the default. Status codes are returned as data, never
//! as errors, so `FaceServiceClient::parse_response` sees every response.

use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::error::FaceError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP request and returns the complete response.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FaceError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FaceError> {
        (**self).execute(request)
    }
}

/// Largest response body read by default, in bytes.
pub const DEFAULT_BODY_LIMIT: u64 = 64 * 1024 * 1024;

/// Blocking transport backed by a `ureq::Agent`.
///
/// Response bodies are read up to a size limit (`DEFAULT_BODY_LIMIT` unless
/// changed with `with_body_limit`). A longer body fails the call with
/// `FaceError::Transport`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_agent(Agent::new_with_defaults())
    }

    /// Wrap a caller-configured agent, e.g. one with timeouts or a proxy.
    /// Statuses are still returned as data whatever the agent's own setting.
    pub fn with_agent(agent: Agent) -> Self {
        Self {
            agent,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FaceError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match method {
            HttpMethod::Get => call(with_headers(self.agent.get(&url), &headers)),
            HttpMethod::Delete => call(with_headers(self.agent.delete(&url), &headers)),
            HttpMethod::Post => send(with_headers(self.agent.post(&url), &headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(&url), &headers), body),
            HttpMethod::Patch => send(with_headers(self.agent.patch(&url), &headers), body),
        };
        let mut response = result?;

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
            .limit(self.body_limit)
            .read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

type UreqResponse = ureq::http::Response<ureq::Body>;

fn with_headers<B>(builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    let mut builder = builder.config().http_status_as_error(false).build();
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn call(builder: RequestBuilder<WithoutBody>) -> Result<UreqResponse, ureq::Error> {
    builder.call()
}

fn send(builder: RequestBuilder<WithBody>, body: Option<String>) -> Result<UreqResponse, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
