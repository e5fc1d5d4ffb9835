use crate::{
    paths,
    portal::{
        views::{self, DashboardPage},
        AppState, PortalError,
    },
    sdk::BrowserCookie,
    session::get_server_session,
    store::SessionStore,
};
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Signed-in landing page; anonymous browsers are sent to login.
#[instrument(skip(state, headers))]
pub async fn dashboard(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, PortalError> {
    let cookie = BrowserCookie::from_headers(&headers);

    let Some(user) = get_server_session(&state.sdk, cookie.as_ref()).await else {
        return Ok(Redirect::to(paths::HOME).into_response());
    };

    let store = SessionStore::new(user.session);
    let identity_id = store
        .snapshot()
        .session
        .and_then(|session| session.identity)
        .map(|identity| identity.id);

    if let (Some(profiles), Some(identity_id)) = (&state.profiles, identity_id) {
        match profiles.fetch(&identity_id).await {
            Ok(profile) => store.set_profile(profile),
            Err(err) => warn!("Failed to fetch profile of {identity_id}: {err}"),
        }
    }

    let snapshot = store.snapshot();
    Ok(views::html(&DashboardPage::new(
        state.config.app_name(),
        &snapshot,
    ))?)
}
