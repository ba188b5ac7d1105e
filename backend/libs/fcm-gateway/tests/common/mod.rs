#![allow(dead_code)]

use async_trait::async_trait;
use fcm_gateway::{AccessToken, FcmClient, FcmConfig, FcmError, TokenProvider};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::MockServer;

pub const PROJECT_ID: &str = "test-project";

/// Hands out `{prefix}-1`, `{prefix}-2`, ... and counts calls
pub struct CountingProvider {
    prefix: String,
    expires_in: i64,
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn new(prefix: &str, expires_in: i64) -> Arc<Self> {
        Arc::new(Self {
            prefix: prefix.to_string(),
            expires_in,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for CountingProvider {
    async fn fetch_token(&self) -> Result<AccessToken, FcmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AccessToken {
            access_token: format!("{}-{}", self.prefix, n),
            expires_in: self.expires_in,
        })
    }
}

pub fn config_for(server: &MockServer) -> FcmConfig {
    FcmConfig::default()
        .with_domain(server.uri())
        .with_topic_domain(server.uri())
}

pub async fn client_for(server: &MockServer, provider: Arc<CountingProvider>) -> FcmClient {
    FcmClient::builder(PROJECT_ID, &config_for(server))
        .token_provider(provider)
        .build()
        .await
        .expect("client")
}

/// multipart/mixed body the way FCM answers a batch
pub fn batch_response_body(boundary: &str, items: &[(u16, Value)]) -> String {
    let mut body = String::new();
    for (idx, (status, json)) in items.iter().enumerate() {
        body.push_str(&format!(
            "--{boundary}\r\n\
             Content-Type: application/http\r\n\
             Content-ID: response-{id}\r\n\
             \r\n\
             HTTP/1.1 {status} {reason}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\
             \r\n\
             {json}\r\n",
            boundary = boundary,
            id = idx + 1,
            status = status,
            reason = if *status == 200 { "OK" } else { "Error" },
            json = serde_json::to_string_pretty(json).unwrap(),
        ));
    }
    body.push_str(&format!("--{}--\r\n", boundary));
    body
}

/// JSON bodies of the sub-requests inside an outgoing batch, in order
pub fn batch_request_payloads(body: &str) -> Vec<Value> {
    let segments: Vec<&str> = body.split("--__END_OF_PART__").collect();
    segments[1..segments.len() - 1]
        .iter()
        .map(|part| {
            let sections: Vec<&str> = part.splitn(3, "\r\n\r\n").collect();
            serde_json::from_str(sections[2].trim()).unwrap()
        })
        .collect()
}
