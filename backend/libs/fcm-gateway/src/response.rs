use once_cell::sync::OnceCell;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::borrow::Cow;

use crate::batch::decode_batch;
use crate::errors::FcmError;
use crate::transport::RawResponse;

/// Response of a single push or topic operation.
///
/// The body is parsed as JSON on first access and cached.
#[derive(Debug)]
pub struct JsonResponse {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    json: OnceCell<Option<Value>>,
}

impl JsonResponse {
    pub fn new(raw: RawResponse) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            json: OnceCell::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_parsable(&self) -> bool {
        !self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Parsed body, `None` when the body is empty
    pub fn json(&self) -> Result<Option<&Value>, FcmError> {
        self.json
            .get_or_try_init(|| {
                if !self.is_parsable() {
                    return Ok(None);
                }
                serde_json::from_slice(&self.body)
                    .map(Some)
                    .map_err(|e| FcmError::ResponseParse(e.to_string()))
            })
            .map(Option::as_ref)
    }
}

/// Response of a batch push: one JSON item per sub-request, in request order
#[derive(Debug, Clone)]
pub struct BatchResponse {
    status: u16,
    headers: HeaderMap,
    body: String,
    items: Vec<Value>,
}

impl BatchResponse {
    /// Decode the multipart body of a 2xx reply; malformed bodies are an error.
    ///
    /// Any other unmapped status (a redirect page, say) passes through with
    /// no items and its body kept as text.
    pub fn from_raw(raw: RawResponse) -> Result<Self, FcmError> {
        if !(200..300).contains(&raw.status) {
            return Ok(Self {
                status: raw.status,
                headers: raw.headers,
                body: String::from_utf8_lossy(&raw.body).into_owned(),
                items: Vec::new(),
            });
        }

        let body = String::from_utf8(raw.body)
            .map_err(|e| FcmError::BatchDecode(format!("body is not UTF-8: {}", e)))?;
        let items = decode_batch(&body)?;

        Ok(Self {
            status: raw.status,
            headers: raw.headers,
            body,
            items,
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn success_count(&self) -> usize {
        self.items.len() - self.failure_count()
    }

    pub fn failure_count(&self) -> usize {
        self.items.iter().filter(|item| is_failure(item)).count()
    }

    /// Failed items with their position in the original request
    pub fn failures(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| is_failure(item))
    }
}

/// An item failed iff it carries a non-null `error` field
pub fn is_failure(item: &Value) -> bool {
    item.get("error").map_or(false, |error| !error.is_null())
}
