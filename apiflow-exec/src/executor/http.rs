use std::collections::BTreeMap;
use std::time::Duration;

use apiflow_core::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Request as handed to the transport; the body is empty when none is sent.
#[derive(Debug, Clone)]
pub struct HttpRequestParts {
    pub method: String,
    pub url: url::Url,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpResponseParts {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponseParts {
    /// Canonical phrase for the status code, e.g. `Not Found` for 404.
    pub fn reason_phrase(&self) -> Option<&'static str> {
        reqwest::StatusCode::from_u16(self.status)
            .ok()?
            .canonical_reason()
    }
}

/// Transport seam under [`HttpDataExtender`](crate::HttpDataExtender).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, TransportError>;
}

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    /// Redirects are not followed: a 3xx is recorded and handed to the step as is.
    fn default() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("apiflow-exec/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| panic!("cannot build the default HTTP client: {e}"));
        Self::new(client)
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, TransportError> {
        let method = reqwest::Method::from_bytes(req.method.as_bytes())
            .map_err(|e| TransportError::Other(format!("invalid method `{}`: {e}", req.method)))?;

        let mut builder = self
            .client
            .request(method, req.url)
            .headers(header_map(&req.headers)?)
            .timeout(timeout);
        if !req.body.is_empty() {
            builder = builder.body(req.body);
        }

        let mut resp = builder.send().await.map_err(transport_error)?;
        let too_large = || TransportError::ResponseTooLarge {
            max_bytes: max_response_bytes,
        };
        if resp
            .content_length()
            .is_some_and(|len| len > max_response_bytes as u64)
        {
            return Err(too_large());
        }

        let status = resp.status().as_u16();
        // Repeated headers (e.g. several Set-Cookie lines) are joined with ", ".
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in resp.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|joined| {
                    joined.push_str(", ");
                    joined.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        // Chunked responses carry no length, so the cap is enforced while reading.
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(transport_error)? {
            if body.len() + chunk.len() > max_response_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponseParts {
            status,
            headers,
            body,
        })
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = |e: &dyn std::fmt::Display| TransportError::Other(format!("invalid header `{name}`: {e}"));
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(&e))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(&e))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() || e.is_request() {
        TransportError::Network(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}
