//! Conversion of `http` types into logger records.

use http::{request, HeaderMap, Response, Version};
use scribe_core::{append_header, RequestRecord, ResponseHead};
use serde_json::{Map, Value};

/// Build a [`RequestRecord`] from request parts. The body is left unset.
pub fn request_record(parts: &request::Parts, start_time: u64) -> RequestRecord {
    let uri = &parts.uri;
    RequestRecord {
        id: None,
        method: parts.method.as_str().to_string(),
        url: uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string()),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        http_version: version_str(parts.version).to_string(),
        headers: headers_to_map(&parts.headers),
        body: None,
        start_time,
    }
}

/// Build a [`ResponseHead`] from a response.
pub fn response_head<B>(response: &Response<B>) -> ResponseHead {
    let status = response.status();
    ResponseHead {
        status: Some(status.as_u16()),
        status_message: status.canonical_reason().map(str::to_string),
        headers: headers_to_map(response.headers()),
    }
}

/// Header map as JSON: lowercase names, repeated names as arrays, non-UTF-8
/// values decoded lossily.
pub fn headers_to_map(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, value) in headers {
        let text = match value.to_str() {
            Ok(text) => text.to_string(),
            Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        };
        append_header(&mut map, name.as_str(), Value::String(text));
    }
    map
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}
