use super::{
    config::DEFAULT_APP_NAME,
    views::{self, ErrorPage},
};
use crate::sdk::SdkError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Failures a page handler could not recover from.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Sdk(#[from] SdkError),
    #[error("failed to render page: {0}")]
    Render(#[from] askama::Error),
}

impl PortalError {
    /// Upstream status for provider answers, 502 when the provider could not be used.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Sdk(err) => err.status().unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        error!("{self}");
        let status = self.status();
        let page = ErrorPage {
            status: Some(status.as_u16()),
            ..ErrorPage::new(DEFAULT_APP_NAME, self.to_string())
        };

        match views::html(&page) {
            Ok(page) => (status, page).into_response(),
            Err(err) => {
                error!("Failed to render error page: {err}");
                (status, self.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_follows_provider_answer() {
        let err = PortalError::from(SdkError::response(StatusCode::FORBIDDEN, json!({})));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);

        let err = PortalError::from(SdkError::Url(url::ParseError::EmptyHost));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
