use crate::{
    portal::AppState,
    sdk::BrowserCookie,
    session::UserSession,
    store::SessionStore,
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::{instrument, warn};

#[utoipa::path(
    get,
    path= "/session",
    responses (
        (status = 200, description = "Session of the browser, empty when signed out", body = UserSession),
        (status = 502, description = "Identity provider could not be reached", body = UserSession)
    ),
    tag= "session"
)]
// axum handler for the session of the calling browser
#[instrument(skip(state, headers))]
pub async fn session(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let cookie = BrowserCookie::from_headers(&headers);
    let store = SessionStore::default();

    store.refetch(|| state.sdk.to_session(cookie.as_ref())).await;

    let snapshot = store.snapshot();
    let identity_id = snapshot
        .session
        .as_ref()
        .and_then(|session| session.identity.as_ref())
        .map(|identity| identity.id.clone());

    if let (Some(profiles), Some(identity_id)) = (&state.profiles, identity_id) {
        match profiles.fetch(&identity_id).await {
            Ok(profile) => store.set_profile(profile),
            Err(err) => warn!("Failed to fetch profile of {identity_id}: {err}"),
        }
    }

    let status = if snapshot.error.is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };

    (status, Json(store.user_session()))
}
