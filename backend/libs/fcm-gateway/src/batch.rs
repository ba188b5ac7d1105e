//! multipart/mixed framing for the FCM `/batch` endpoint.
//!
//! Every part wraps a complete `POST .../messages:send` HTTP request. The
//! server answers with one part per request, in the same order, each holding
//! a complete HTTP response. Parts are correlated by position only.

use reqwest::header::HeaderMap;
use serde_json::Value;
use std::borrow::Cow;

use crate::errors::FcmError;
use crate::request::PushBody;

/// Boundary used for outgoing batch bodies
pub const BATCH_BOUNDARY: &str = "__END_OF_PART__";

const CRLF: &str = "\r\n";
const BLANK_LINE: &str = "\r\n\r\n";

/// One sub-request of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPart {
    /// 1-based position, only used to make logs readable
    pub content_id: usize,
    pub serialized_request: String,
}

impl BatchPart {
    pub fn render(&self, boundary: &str) -> String {
        format!(
            "--{boundary}\r\n\
             Content-Length: {len}\r\n\
             Content-Type: application/http\r\n\
             Content-Id: {id}\r\n\
             Content-Transfer-Encoding: binary\r\n\
             \r\n\
             {request}\r\n",
            boundary = boundary,
            len = self.serialized_request.len(),
            id = self.content_id,
            request = self.serialized_request,
        )
    }
}

/// Serialize one push as an embedded HTTP/1.1 request
pub fn serialize_sub_request(
    path: &str,
    payload: &PushBody,
    headers: &HeaderMap,
) -> Result<String, FcmError> {
    let body = payload.to_json_string()?;
    let mut request = format!("POST {} HTTP/1.1\r\nContent-Length: {}\r\n", path, body.len());

    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|v| {
                v.to_str().map_err(|e| {
                    FcmError::InvalidRequest(format!("Header {} is not printable: {}", name, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        request.push_str(&format!("{}: {}\r\n", name, values.join(", ")));
    }

    request.push_str(CRLF);
    request.push_str(&body);
    request.push_str(CRLF);
    Ok(request)
}

pub fn build_parts(
    path: &str,
    payloads: &[PushBody],
    headers: &HeaderMap,
) -> Result<Vec<BatchPart>, FcmError> {
    payloads
        .iter()
        .enumerate()
        .map(|(idx, payload)| {
            Ok(BatchPart {
                content_id: idx + 1,
                serialized_request: serialize_sub_request(path, payload, headers)?,
            })
        })
        .collect()
}

/// Encode the payloads into one multipart/mixed body, preserving order
pub fn encode_batch(
    path: &str,
    payloads: &[PushBody],
    headers: &HeaderMap,
) -> Result<String, FcmError> {
    let mut body: String = build_parts(path, payloads, headers)?
        .iter()
        .map(|part| part.render(BATCH_BOUNDARY))
        .collect();
    body.push_str(&format!("--{}--\r\n", BATCH_BOUNDARY));
    Ok(body)
}

/// Decode a multipart/mixed batch response into per-item JSON, in order.
///
/// The delimiter is taken from the body's own first separator line, since
/// the server picks its own boundary (usually `batch_...`).
pub fn decode_batch(body: &str) -> Result<Vec<Value>, FcmError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let delimiter = find_delimiter(body)?;
    let body: Cow<'_, str> = if body.starts_with(CRLF) {
        Cow::Borrowed(body)
    } else {
        Cow::Owned(format!("{}{}", CRLF, body))
    };

    let segments: Vec<&str> = body.split(delimiter.as_str()).collect();
    let closing = segments.last().copied().unwrap_or_default();
    if segments.len() < 2 || !closing.starts_with("--") {
        return Err(FcmError::BatchDecode(
            "missing closing boundary, response truncated".into(),
        ));
    }

    segments[1..segments.len() - 1]
        .iter()
        .enumerate()
        .map(|(idx, segment)| decode_part(idx, segment))
        .collect()
}

/// `\r\n--<token>` taken from the first line that starts with `--`
fn find_delimiter(body: &str) -> Result<String, FcmError> {
    let line = body
        .lines()
        .find(|line| line.starts_with("--"))
        .ok_or_else(|| FcmError::BatchDecode("no boundary line found".into()))?;

    let line_token = line.trim_end();
    // A closing `--token--` line also names the boundary
    let token = line_token
        .strip_suffix("--")
        .filter(|t| t.len() > 2)
        .unwrap_or(line_token);
    if token.len() <= 2 {
        return Err(FcmError::BatchDecode(format!("empty boundary in line {:?}", line)));
    }

    Ok(format!("{}{}", CRLF, token))
}

/// Sections: part headers, embedded status line + headers, JSON payload
fn decode_part(idx: usize, segment: &str) -> Result<Value, FcmError> {
    let sections: Vec<&str> = segment.splitn(3, BLANK_LINE).collect();
    if sections.len() < 3 {
        return Err(FcmError::BatchDecode(format!(
            "part {} has {} sections, expected 3",
            idx + 1,
            sections.len()
        )));
    }

    serde_json::from_str(sections[2].trim()).map_err(|e| {
        FcmError::BatchDecode(format!("part {} is not valid JSON: {}", idx + 1, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use serde_json::json;

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        headers
    }

    fn response_part(boundary: &str, idx: usize, status: &str, json: &str) -> String {
        format!(
            "--{boundary}\r\n\
             Content-Type: application/http\r\n\
             Content-ID: response-{idx}\r\n\
             \r\n\
             HTTP/1.1 {status}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\
             Vary: Origin\r\n\
             \r\n\
             {json}\r\n",
        )
    }

    #[test]
    fn test_single_part_exact_framing() {
        let body = encode_batch(
            "/v1/projects/p/messages:send",
            &[PushBody::from("{\"a\":1}")],
            &headers(),
        )
        .unwrap();

        let sub_request = "POST /v1/projects/p/messages:send HTTP/1.1\r\n\
                           Content-Length: 7\r\n\
                           content-type: application/json\r\n\
                           accept: application/json\r\n\
                           authorization: Bearer tok\r\n\
                           \r\n\
                           {\"a\":1}\r\n";
        let expected = format!(
            "--__END_OF_PART__\r\n\
             Content-Length: {}\r\n\
             Content-Type: application/http\r\n\
             Content-Id: 1\r\n\
             Content-Transfer-Encoding: binary\r\n\
             \r\n\
             {}\r\n\
             --__END_OF_PART__--\r\n",
            sub_request.len(),
            sub_request
        );

        assert_eq!(body, expected);
    }

    #[test]
    fn test_parts_keep_input_order() {
        let payloads: Vec<PushBody> = (0..3)
            .map(|i| PushBody::Json(json!({ "message": { "topic": format!("t{}", i) } })))
            .collect();

        let parts = build_parts("/x", &payloads, &headers()).unwrap();
        assert_eq!(parts.len(), 3);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.content_id, i + 1);
            assert!(part.serialized_request.contains(&format!("\"t{}\"", i)));
        }

        let body = encode_batch("/x", &payloads, &headers()).unwrap();
        let t0 = body.find("\"t0\"").unwrap();
        let t1 = body.find("\"t1\"").unwrap();
        let t2 = body.find("\"t2\"").unwrap();
        assert!(t0 < t1 && t1 < t2);
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let payload = PushBody::from("{\"title\":\"héllo\"}");
        let request = serialize_sub_request("/x", &payload, &HeaderMap::new()).unwrap();
        assert!(request.contains("Content-Length: 18\r\n"));
    }

    #[test]
    fn test_empty_batch_is_just_the_closing_boundary() {
        let body = encode_batch("/x", &[], &headers()).unwrap();
        assert_eq!(body, "--__END_OF_PART__--\r\n");
    }

    #[test]
    fn test_decode_response_in_order() {
        let body = format!(
            "{}{}{}--batch_abc--\r\n",
            response_part("batch_abc", 1, "200 OK", "{\n  \"name\": \"projects/p/messages/1\"\n}"),
            response_part(
                "batch_abc",
                2,
                "400 Bad Request",
                "{\"error\": {\"code\": 400, \"status\": \"INVALID_ARGUMENT\"}}"
            ),
            response_part("batch_abc", 3, "200 OK", "{\"name\": \"projects/p/messages/3\"}"),
        );

        let items = decode_batch(&body).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["name"], "projects/p/messages/1");
        assert_eq!(items[1]["error"]["code"], 400);
        assert_eq!(items[2]["name"], "projects/p/messages/3");
    }

    #[test]
    fn test_decode_with_leading_crlf() {
        let body = format!(
            "\r\n{}--batch_x--\r\n",
            response_part("batch_x", 1, "200 OK", "{\"name\":\"n1\"}")
        );
        let items = decode_batch(&body).unwrap();
        assert_eq!(items, vec![json!({ "name": "n1" })]);
    }

    #[test]
    fn test_decode_empty_bodies() {
        assert!(decode_batch("").unwrap().is_empty());
        assert!(decode_batch("--batch_x--\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_decode_without_boundary_fails() {
        let result = decode_batch("{\"error\": \"not multipart\"}");
        assert!(matches!(result, Err(FcmError::BatchDecode(_))));
    }

    #[test]
    fn test_decode_truncated_body_fails() {
        let body = response_part("batch_x", 1, "200 OK", "{\"name\":\"n1\"}");
        let result = decode_batch(&body);
        assert!(matches!(result, Err(FcmError::BatchDecode(_))));
    }

    #[test]
    fn test_decode_malformed_part_fails() {
        let body = "--batch_x\r\nContent-Type: application/http\r\n\r\nHTTP/1.1 200 OK\r\n--batch_x--\r\n";
        let result = decode_batch(body);
        assert!(matches!(result, Err(FcmError::BatchDecode(_))));

        let body = format!(
            "{}--batch_x--\r\n",
            response_part("batch_x", 1, "200 OK", "{not json")
        );
        assert!(matches!(decode_batch(&body), Err(FcmError::BatchDecode(_))));
    }

    #[test]
    fn test_delimiter_from_opening_or_closing_line() {
        assert_eq!(find_delimiter("--batch_x\r\n").unwrap(), "\r\n--batch_x");
        assert_eq!(find_delimiter("--batch_x--\r\n").unwrap(), "\r\n--batch_x");
        assert_eq!(find_delimiter("----\r\n").unwrap(), "\r\n----");
        assert!(matches!(find_delimiter("--\r\n"), Err(FcmError::BatchDecode(_))));
    }
}
