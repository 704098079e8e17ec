//! Header filtering applied when copying headers between the inbound request,
//! upstream calls, and relayed responses.

use axum::http::header::{
    HeaderMap, HeaderName, CONNECTION, CONTENT_LENGTH, HOST, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};

static HOP_BY_HOP: &[HeaderName] = &[
    CONNECTION,
    TRANSFER_ENCODING,
    TE,
    TRAILER,
    UPGRADE,
    PROXY_AUTHORIZATION,
    PROXY_AUTHENTICATE,
];

/// Copy of `headers` without hop-by-hop headers or any header named in
/// `Connection`. Keep-alive is always dropped.
pub fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(name) || listed.contains(name) || name.as_str() == "keep-alive" {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers to send upstream: end-to-end headers minus `Host` (the target
/// authority decides it) and `Content-Length` (the outbound body may differ).
pub fn for_upstream(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = end_to_end(inbound);
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    headers
}
