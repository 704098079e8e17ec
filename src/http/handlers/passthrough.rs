//! Single-upstream routes: the request is forwarded and the upstream's
//! response returned verbatim.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method};
use axum::response::Response;

use crate::aggregate::error::Result;
use crate::aggregate::require_credential;
use crate::http::request::RequestIdExt;
use crate::http::response::relay;
use crate::http::server::AppState;
use crate::upstream::Upstream;

/// `POST /api/v1/auth/login` → auth `POST /sessions`
pub async fn login(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    let response = state
        .aggregator()
        .forward(Upstream::Auth, Method::POST, &["sessions"], None, &headers, Some(body))
        .await?;
    tracing::info!(request_id = %headers.request_id(), status = response.status.as_u16(), "Login forwarded");
    Ok(relay(response))
}

/// `POST /api/v1/auth/register` → auth `POST /accounts`
pub async fn register(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    let response = state
        .aggregator()
        .forward(Upstream::Auth, Method::POST, &["accounts"], None, &headers, Some(body))
        .await?;
    tracing::info!(request_id = %headers.request_id(), status = response.status.as_u16(), "Registration forwarded");
    Ok(relay(response))
}

/// `DELETE /api/v1/users/{username}` → auth `DELETE /accounts/{username}`
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let response = state.aggregator().delete_user(&username, &headers).await?;
    tracing::info!(
        request_id = %headers.request_id(),
        username = %username,
        status = response.status.as_u16(),
        "Account deletion forwarded"
    );
    Ok(relay(response))
}

/// `GET /api/v1/profiles/me`
pub async fn get_my_profile(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    require_credential(&headers)?;
    let response = state
        .aggregator()
        .forward(Upstream::Profile, Method::GET, &["profiles", "me"], None, &headers, None)
        .await?;
    Ok(relay(response))
}

/// `PUT /api/v1/profiles/me`
pub async fn update_my_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    require_credential(&headers)?;
    let response = state
        .aggregator()
        .forward(Upstream::Profile, Method::PUT, &["profiles", "me"], None, &headers, Some(body))
        .await?;
    Ok(relay(response))
}

/// `GET /api/v1/profiles/search`, query string passed through.
pub async fn search_profiles(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response> {
    let response = state
        .aggregator()
        .forward(
            Upstream::Profile,
            Method::GET,
            &["profiles", "search"],
            query.as_deref(),
            &headers,
            None,
        )
        .await?;
    Ok(relay(response))
}

/// `GET /api/v1/profiles/{username}`, public.
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let response = state
        .aggregator()
        .forward(Upstream::Profile, Method::GET, &["profiles", username.as_str()], None, &headers, None)
        .await?;
    Ok(relay(response))
}

/// `GET /api/v1/profiles/stats/me`
pub async fn get_profile_stats(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    require_credential(&headers)?;
    let response = state
        .aggregator()
        .forward(
            Upstream::Profile,
            Method::GET,
            &["profiles", "stats", "me"],
            None,
            &headers,
            None,
        )
        .await?;
    Ok(relay(response))
}
