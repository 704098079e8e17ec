//! Relaying upstream responses to the client.
//!
//! # Responsibilities
//! - Pass status, end-to-end headers and body through unchanged
//! - Drop hop-by-hop headers and `Content-Length` (recomputed from the body)

use axum::body::Body;
use axum::http::header::CONTENT_LENGTH;
use axum::response::Response;

use crate::upstream::{headers, UpstreamResponse};

pub fn relay(upstream: UpstreamResponse) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;

    let mut relayed = headers::end_to_end(&upstream.headers);
    relayed.remove(CONTENT_LENGTH);
    *response.headers_mut() = relayed;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::header::{CONNECTION, CONTENT_TYPE};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};

    #[tokio::test]
    async fn test_relay_keeps_status_headers_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("2"));
        headers.insert("set-cookie", HeaderValue::from_static("session=1"));

        let response = relay(UpstreamResponse {
            status: StatusCode::CREATED,
            headers,
            body: Bytes::from_static(b"{}"),
        });

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["set-cookie"], "session=1");
        assert!(response.headers().get(CONNECTION).is_none());
        assert!(response.headers().get(CONTENT_LENGTH).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{}");
    }
}
