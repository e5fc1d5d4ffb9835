use super::resolve;
use crate::{
    paths,
    portal::{AppState, PortalError},
    recovery::ErrorHandler,
    sdk::{BrowserCookie, Flow},
};
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Default, Deserialize)]
pub struct LogoutQuery {
    return_to: Option<String>,
}

/// Ends the session through the provider's logout URL.
#[instrument(skip(state, headers))]
pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<LogoutQuery>,
) -> Result<Response, PortalError> {
    let cookie = BrowserCookie::from_headers(&headers);
    let return_to = super::non_empty(query.return_to);

    match state
        .sdk
        .create_browser_logout_flow(return_to.as_deref(), cookie.as_ref())
        .await
    {
        Ok(flow) => {
            debug!("redirecting to logout URL");
            Ok(Redirect::to(&flow.logout_url).into_response())
        }
        Err(err) => {
            let recovery = ErrorHandler::<Flow>::new()
                .with_default_nav(paths::HOME)
                .with_fatal_to_error(true)
                .handle(err, &state.current_url(&uri))
                .await?;
            resolve(recovery, |_| Ok(Redirect::to(paths::HOME).into_response()))
        }
    }
}
