#![allow(clippy::needless_for_each)]

//! The browser-facing pages, served with axum.

use crate::{
    paths,
    portal::handlers::{health::__path_health, session::__path_session},
    profile::ProfileClient,
    sdk::{FrontendApi, Identity, Session},
    session::{ProfileData, UserSession},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request, Uri},
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;

pub mod config;
pub mod error;
pub(crate) mod handlers;
pub mod views;

pub use self::config::PortalConfig;
pub use self::error::PortalError;

#[derive(OpenApi)]
#[openapi(
    paths(health, session),
    components(schemas(handlers::health::Health, UserSession, Session, Identity, ProfileData)),
    tags(
        (name = "portal", description = "Authentication front end")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// What every handler needs: the provider client and the portal settings.
#[derive(Debug)]
pub struct AppState {
    pub config: PortalConfig,
    pub sdk: FrontendApi,
    pub profiles: Option<ProfileClient>,
}

impl AppState {
    /// # Errors
    /// Returns an error if one of the HTTP clients cannot be built.
    pub fn new(config: PortalConfig) -> Result<Self> {
        let sdk = FrontendApi::new(config.sdk_url(), config.request_timeout())
            .context("Failed to create identity provider client")?;

        let profiles = config
            .profile_url()
            .map(|url| ProfileClient::new(url.clone(), config.request_timeout()))
            .transpose()?;

        Ok(Self {
            config,
            sdk,
            profiles,
        })
    }

    /// Public URL of the page being served, used to resolve provider redirects.
    #[must_use]
    pub fn current_url(&self, uri: &Uri) -> Url {
        let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
        let public_url = self.config.public_url();
        public_url.join(path).unwrap_or_else(|_| public_url.clone())
    }
}

/// Routes and middleware of the portal.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            paths::LOGIN,
            get(handlers::login::show).post(handlers::login::submit),
        )
        .route(
            paths::REGISTRATION,
            get(handlers::registration::show).post(handlers::registration::submit),
        )
        .route(
            paths::VERIFICATION,
            get(handlers::verification::show).post(handlers::verification::submit),
        )
        .route(paths::DASHBOARD, get(handlers::dashboard::dashboard))
        .route(paths::LOGOUT, get(handlers::logout::logout))
        .route(paths::ERROR, get(handlers::error::error))
        .route(paths::SESSION, get(handlers::session))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state.clone())),
        )
        .route(paths::HEALTH, get(handlers::health).options(handlers::health))
        .layer(Extension(state))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, config: PortalConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config)?);

    info!(
        "Identity provider at {}, public URL {}",
        state.sdk.base_url(),
        state.config.public_url()
    );

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn state(public_url: &str) -> AppState {
        let config = PortalConfig::new("http://kratos:4433", Url::parse(public_url).unwrap())
            .with_request_timeout(Duration::from_secs(1));
        AppState::new(config).unwrap()
    }

    #[test]
    fn current_url_joins_public_url() {
        let state = state("https://portal.example/");
        let uri: Uri = "/verification?flow=abc".parse().unwrap();
        assert_eq!(
            state.current_url(&uri).as_str(),
            "https://portal.example/verification?flow=abc"
        );
    }

    #[test]
    fn profile_client_is_optional() {
        let state = state("http://localhost:8080");
        assert!(state.profiles.is_none());
    }

    #[test]
    fn openapi_lists_json_routes() {
        let doc = openapi();
        assert!(doc.paths.paths.contains_key(paths::HEALTH));
        assert!(doc.paths.paths.contains_key(paths::SESSION));
    }
}
