use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Proxy;
use tracing::debug;

use crate::config::{FcmConfig, ProxyConfig};
use crate::errors::FcmError;
use crate::request::OutboundRequest;

/// Status, headers and body exactly as received
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Sends a fully built request and returns the raw response.
///
/// Implementations must be safe to share between concurrent operations.
/// Any failure before a status line is read is reported as
/// [`FcmError::Network`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, FcmError>;
}

/// Pooled keep-alive transport backed by `reqwest`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FcmConfig) -> Result<Self, FcmError> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, FcmError> {
        let OutboundRequest {
            url,
            method,
            headers,
            body,
        } = request;

        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(network_error)?.to_vec();

        debug!(status, body_len = body.len(), "Received FCM response");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Build the shared HTTP client honouring timeouts and proxy settings
pub fn build_http_client(config: &FcmConfig) -> Result<reqwest::Client, FcmError> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = config.open_timeout {
        builder = builder.connect_timeout(timeout);
    }
    // Bounds the whole exchange, response body included
    if let Some(timeout) = config.read_timeout {
        builder = builder.timeout(timeout);
    }

    builder = match &config.proxy {
        None => builder.no_proxy(),
        // reqwest reads HTTP(S)_PROXY / NO_PROXY on its own
        Some(ProxyConfig::Environment) => builder,
        Some(proxy_config @ ProxyConfig::Explicit { uri, .. }) => {
            let mut proxy = Proxy::all(uri.as_str())
                .map_err(|e| FcmError::Config(format!("Invalid proxy URI {}: {}", uri, e)))?;
            if let Some((user, password)) = proxy_config.basic_auth() {
                proxy = proxy.basic_auth(user, password);
            }
            builder.proxy(proxy)
        }
    };

    builder
        .build()
        .map_err(|e| FcmError::Config(format!("Failed to build HTTP client: {}", e)))
}

fn network_error(err: reqwest::Error) -> FcmError {
    let cause = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "malformed response"
    } else {
        "request failed"
    };
    FcmError::Network(format!("{} ({})", cause, err))
}
