use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE,
};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::batch::{encode_batch, BATCH_BOUNDARY};
use crate::config::FcmConfig;
use crate::errors::FcmError;

pub const V1_ENDPOINT_PREFIX: &str = "/v1/projects/";
pub const V1_ENDPOINT_SUFFIX: &str = "/messages:send";
pub const TOPIC_ENDPOINT_PREFIX: &str = "/iid/v1";
pub const BATCH_ENDPOINT: &str = "/batch";
pub const TOPIC_PREFIX: &str = "/topics/";

const APPLICATION_JSON: &str = "application/json";

/// Fully formed request, ready for the transport
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Message body for a push: either pre-serialized JSON or a JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum PushBody {
    Raw(String),
    Json(Value),
}

impl PushBody {
    pub fn to_json_string(&self) -> Result<String, FcmError> {
        match self {
            PushBody::Raw(raw) => Ok(raw.clone()),
            PushBody::Json(value) => serde_json::to_string(value)
                .map_err(|e| FcmError::InvalidRequest(format!("Failed to serialize body: {}", e))),
        }
    }
}

impl From<String> for PushBody {
    fn from(raw: String) -> Self {
        PushBody::Raw(raw)
    }
}

impl From<&str> for PushBody {
    fn from(raw: &str) -> Self {
        PushBody::Raw(raw.to_string())
    }
}

impl From<Value> for PushBody {
    fn from(value: Value) -> Self {
        PushBody::Json(value)
    }
}

/// Caller-supplied query parameters and extra headers
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Like [`RequestOptions::header`], parsing name and value from strings
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, FcmError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FcmError::InvalidRequest(format!("Invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FcmError::InvalidRequest(format!("Invalid header value: {}", e)))?;
        Ok(self.header(name, value))
    }
}

/// Target of an outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Push { project_id: String },
    Subscribe,
    Unsubscribe,
    Batch,
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Push { project_id } => push_path(project_id),
            Endpoint::Subscribe => format!("{}:batchAdd", TOPIC_ENDPOINT_PREFIX),
            Endpoint::Unsubscribe => format!("{}:batchRemove", TOPIC_ENDPOINT_PREFIX),
            Endpoint::Batch => BATCH_ENDPOINT.to_string(),
        }
    }

    /// Message-send domain for push/batch, instance-ID domain for topics
    pub fn domain<'a>(&self, config: &'a FcmConfig) -> &'a str {
        match self {
            Endpoint::Push { .. } | Endpoint::Batch => &config.domain,
            Endpoint::Subscribe | Endpoint::Unsubscribe => &config.topic_domain,
        }
    }

    pub fn url(&self, config: &FcmConfig, query: &[(String, String)]) -> Result<Url, FcmError> {
        let domain = self.domain(config);
        let mut url = Url::parse(domain)
            .and_then(|base| base.join(&self.path()))
            .map_err(|e| FcmError::InvalidRequest(format!("Invalid endpoint URL {}: {}", domain, e)))?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

/// Topic subscription direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

impl SubscriptionAction {
    pub fn endpoint(self) -> Endpoint {
        match self {
            SubscriptionAction::Subscribe => Endpoint::Subscribe,
            SubscriptionAction::Unsubscribe => Endpoint::Unsubscribe,
        }
    }
}

#[derive(Debug, Serialize)]
struct SubscriptionBody<'a> {
    to: &'a str,
    registration_tokens: Vec<&'a str>,
}

pub fn push_path(project_id: &str) -> String {
    format!("{}{}{}", V1_ENDPOINT_PREFIX, project_id, V1_ENDPOINT_SUFFIX)
}

/// Prefix `/topics/` unless already present
pub fn normalize_topic(topic: &str) -> String {
    if topic.starts_with(TOPIC_PREFIX) {
        topic.to_string()
    } else {
        format!("{}{}", TOPIC_PREFIX, topic)
    }
}

/// Caller headers plus the reserved JSON/bearer headers, which always win
pub fn authorized_headers(caller: &HeaderMap, access_token: &str) -> Result<HeaderMap, FcmError> {
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", access_token))
        .map_err(|e| FcmError::InvalidRequest(format!("Invalid access token: {}", e)))?;
    bearer.set_sensitive(true);

    let mut headers = caller.clone();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

pub fn build_push_request(
    config: &FcmConfig,
    project_id: &str,
    body: &PushBody,
    access_token: &str,
    options: &RequestOptions,
) -> Result<OutboundRequest, FcmError> {
    let endpoint = Endpoint::Push {
        project_id: project_id.to_string(),
    };

    Ok(OutboundRequest {
        url: endpoint.url(config, &options.query)?,
        method: Method::POST,
        headers: authorized_headers(&options.headers, access_token)?,
        body: body.to_json_string()?.into_bytes(),
    })
}

pub fn build_subscription_request<S: AsRef<str>>(
    config: &FcmConfig,
    action: SubscriptionAction,
    topic: &str,
    instance_ids: &[S],
    access_token: &str,
    options: &RequestOptions,
) -> Result<OutboundRequest, FcmError> {
    let topic = normalize_topic(topic);
    let body = SubscriptionBody {
        to: &topic,
        registration_tokens: instance_ids.iter().map(|id| id.as_ref()).collect(),
    };
    let body = serde_json::to_vec(&body)
        .map_err(|e| FcmError::InvalidRequest(format!("Failed to serialize body: {}", e)))?;

    let mut headers = authorized_headers(&options.headers, access_token)?;
    // IID only accepts OAuth2 bearer tokens when this header is present
    headers.insert(
        HeaderName::from_static("access_token_auth"),
        HeaderValue::from_static("true"),
    );

    Ok(OutboundRequest {
        url: action.endpoint().url(config, &options.query)?,
        method: Method::POST,
        headers,
        body,
    })
}

pub fn build_batch_request(
    config: &FcmConfig,
    project_id: &str,
    payloads: &[PushBody],
    access_token: &str,
    options: &RequestOptions,
) -> Result<OutboundRequest, FcmError> {
    let part_headers = authorized_headers(&options.headers, access_token)?;
    let body = encode_batch(&push_path(project_id), payloads, &part_headers)?;

    let mut headers = part_headers;
    let content_type = format!("multipart/mixed; boundary={}", BATCH_BOUNDARY);
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .map_err(|e| FcmError::InvalidRequest(e.to_string()))?,
    );

    Ok(OutboundRequest {
        url: Endpoint::Batch.url(config, &options.query)?,
        method: Method::POST,
        headers,
        body: body.into_bytes(),
    })
}
