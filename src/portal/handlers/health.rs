use crate::{portal::AppState, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    identity: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Identity provider is alive", body = [Health]),
        (status = 503, description = "Identity provider is not reachable", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let alive = state.0.sdk.is_alive().await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        identity: if alive {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    if alive {
        debug!("Identity provider is alive");
        (StatusCode::OK, headers, body)
    } else {
        error!("Identity provider is not alive");
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}
