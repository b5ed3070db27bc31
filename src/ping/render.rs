//! Classification → uncacheable plain-text response.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode, Version},
    response::{IntoResponse, Response},
};

use super::classify::Classification;

pub const CACHE_CONTROL: &str = "must-revalidate, no-store";
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const EXPIRES: &str = "0";

/// A fully rendered ping response, independent of any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSpec {
    pub status: StatusCode,
    pub body: &'static str,
    pub headers: HeaderMap,
    /// The caller declared HTTP/1.0, which ignores `Cache-Control` and
    /// relies on `Expires` alone.
    pub requires_expires_override: bool,
}

/// Render a classification. Pure: same inputs, same response.
///
/// `Expires: 0` is sent whatever the protocol version.
pub fn render(classification: &Classification, version: Option<Version>) -> ResponseSpec {
    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
    headers.insert(header::EXPIRES, HeaderValue::from_static(EXPIRES));

    ResponseSpec {
        status: classification.status,
        body: classification.body,
        headers,
        requires_expires_override: version == Some(Version::HTTP_10),
    }
}

impl IntoResponse for ResponseSpec {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}
