use crate::portal::{
    views::{self, ErrorPage},
    AppState, PortalError,
};
use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

const GENERIC_MESSAGE: &str = "Something went wrong.";

#[derive(Debug, Default, Deserialize)]
pub struct ErrorQuery {
    /// JSON context written by the recovery handler.
    error: Option<String>,
    id: Option<String>,
}

/// Generic error page.
#[instrument(skip(state))]
pub async fn error(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ErrorQuery>,
) -> Result<Response, PortalError> {
    let mut page = ErrorPage::new(state.config.app_name(), GENERIC_MESSAGE);

    if let Some(raw) = query.error.filter(|raw| !raw.is_empty()) {
        page = match serde_json::from_str::<Value>(&raw) {
            Ok(context) => page.with_context(&context),
            Err(_) => ErrorPage {
                details: raw,
                ..page
            },
        };
    }

    let id = super::non_empty(query.id);

    // ids of errors stored by the provider are UUIDs, anything else is an error code
    if let Some(id) = id.as_deref().filter(|id| Uuid::parse_str(id).is_ok()) {
        match state.sdk.get_flow_error(id).await {
            Ok(flow_error) => page = page.with_flow_error(&flow_error),
            Err(err) => warn!("Failed to fetch error {id}: {err}"),
        }
    }

    Ok(views::html(&page.with_id(id))?)
}
