//! Classification of identity provider errors into recovery actions.
//!
//! The provider signals what the browser should do next through the status
//! code and a few payload fields. [`ErrorHandler::handle`] turns an
//! [`SdkError`] into a [`Recovery`]: an in-app redirect, a full browser
//! navigation, a replacement flow, or the error itself when the caller has to
//! deal with it.
//!
//! | status | payload | outcome |
//! |--------|---------|---------|
//! | 400 | `id == session_already_available` | redirect home |
//! | 400 | flow setter enabled | replace the flow with the body |
//! | 401 | | redirect home |
//! | 403 | `session_aal2_required` | redirect home asking for AAL2 |
//! | 403 | `session_refresh_required` + `redirect_browser_to` | navigate there |
//! | 404 | | error page with serialized context |
//! | 410 | `use_flow_id` + getter | refetch, else default path |
//! | 422 | `redirect_browser_to` | navigate, redirect or refetch depending on host/path |
//! | other | | error page when fatal, otherwise the error |

use crate::{paths, sdk::SdkError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{error, instrument, warn};
use url::{form_urlencoded, Url};

/// Error ids the handler reacts to.
pub const SESSION_ALREADY_AVAILABLE: &str = "session_already_available";
pub const SESSION_AAL2_REQUIRED: &str = "session_aal2_required";
pub const SESSION_REFRESH_REQUIRED: &str = "session_refresh_required";

/// What the page should do after a provider error.
#[derive(Clone, Debug, PartialEq)]
pub enum Recovery<T> {
    /// In-app navigation to a path (with query).
    Redirect(String),
    /// Full browser navigation to an absolute URL.
    Navigate(String),
    /// The response body replaces the flow being shown.
    SetFlow(T),
    /// The flow was fetched again.
    Refetched(T),
}

/// Fetches a flow by id, the "flow getter" of the handler.
#[async_trait]
pub trait FlowFetcher<T>: Send + Sync {
    async fn fetch_flow(&self, id: &str) -> Result<T, SdkError>;
}

/// Recovery policy of one page.
pub struct ErrorHandler<'a, T> {
    get_flow: Option<&'a dyn FlowFetcher<T>>,
    set_flow: bool,
    default_nav: Option<String>,
    fatal_to_error: bool,
}

impl<T> Default for ErrorHandler<'_, T> {
    fn default() -> Self {
        Self {
            get_flow: None,
            set_flow: false,
            default_nav: None,
            fatal_to_error: false,
        }
    }
}

impl<'a, T> ErrorHandler<'a, T>
where
    T: DeserializeOwned + Send,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables refetching flows (410 `use_flow_id`, 422 same-path `flow`).
    #[must_use]
    pub fn with_get_flow(mut self, fetcher: &'a dyn FlowFetcher<T>) -> Self {
        self.get_flow = Some(fetcher);
        self
    }

    /// Lets a 400 body replace the flow being shown.
    #[must_use]
    pub const fn with_set_flow(mut self) -> Self {
        self.set_flow = true;
        self
    }

    /// Path used when a flow cannot be recovered.
    #[must_use]
    pub fn with_default_nav(mut self, path: impl Into<String>) -> Self {
        self.default_nav = Some(path.into());
        self
    }

    /// Sends unhandled errors to the error page instead of returning them.
    #[must_use]
    pub const fn with_fatal_to_error(mut self, fatal: bool) -> Self {
        self.fatal_to_error = fatal;
        self
    }

    /// Decides how to recover from `err` raised while serving `current_url`.
    ///
    /// # Errors
    /// Returns the error (or the error of a failed refetch) when it cannot be
    /// recovered and the handler is not fatal.
    #[instrument(skip(self, err), fields(status = ?err.status()))]
    pub async fn handle(&self, err: SdkError, current_url: &Url) -> Result<Recovery<T>, SdkError> {
        if let Some(status) = err.status() {
            if let Some(recovery) = self.classify(status, &err, current_url).await? {
                return Ok(recovery);
            }
        }

        error!("unhandled identity provider error: {err}");

        if self.fatal_to_error {
            warn!("fatal error, redirecting to {}", paths::ERROR);
            return Ok(Recovery::Redirect(fatal_page(&err, current_url)));
        }

        Err(err)
    }

    /// `Ok(None)` means the status/payload combination is not recoverable.
    async fn classify(
        &self,
        status: StatusCode,
        err: &SdkError,
        current_url: &Url,
    ) -> Result<Option<Recovery<T>>, SdkError> {
        match status {
            StatusCode::BAD_REQUEST => {
                if err.error_id() == Some(SESSION_ALREADY_AVAILABLE) {
                    return Ok(Some(Recovery::Redirect(paths::HOME.to_string())));
                }
                if self.set_flow {
                    if let Some(data) = err.data() {
                        match serde_json::from_value::<T>(data.clone()) {
                            Ok(flow) => {
                                warn!("400: updating flow data");
                                return Ok(Some(Recovery::SetFlow(flow)));
                            }
                            Err(decode) => warn!("400 body is not a flow: {decode}"),
                        }
                    }
                }
                Ok(None)
            }
            StatusCode::UNAUTHORIZED => {
                warn!("401: redirecting to {}", paths::HOME);
                Ok(Some(Recovery::Redirect(paths::HOME.to_string())))
            }
            StatusCode::FORBIDDEN => match err.error_id() {
                Some(SESSION_AAL2_REQUIRED) => {
                    Ok(Some(Recovery::Redirect(paths::HOME_AAL2.to_string())))
                }
                Some(SESSION_REFRESH_REQUIRED) => Ok(err.redirect_browser_to().map(|target| {
                    warn!("403: redirecting browser to {target}");
                    Recovery::Navigate(target.to_string())
                })),
                _ => Ok(None),
            },
            StatusCode::NOT_FOUND => {
                warn!("404: redirecting to {}", paths::ERROR);
                Ok(Some(Recovery::Redirect(error_page(err, current_url, None))))
            }
            StatusCode::GONE => {
                if let (Some(fetcher), Some(flow_id)) = (self.get_flow, err.use_flow_id()) {
                    warn!("410: refetching flow {flow_id}");
                    return self.refetch(fetcher, flow_id).await.map(Some);
                }
                Ok(self.default_nav.as_ref().map(|nav| {
                    warn!("410: redirecting to {nav}");
                    Recovery::Redirect(nav.clone())
                }))
            }
            StatusCode::UNPROCESSABLE_ENTITY => match err.redirect_browser_to() {
                Some(target) => self.follow(target, current_url).await.map(Some),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// 422: the provider wants the browser somewhere else.
    async fn follow(&self, target: &str, current_url: &Url) -> Result<Recovery<T>, SdkError> {
        let Ok(redirect) = current_url.join(target) else {
            warn!("422: unparsable redirect target, redirecting browser to {target}");
            return Ok(Recovery::Navigate(target.to_string()));
        };

        if redirect.host_str() != current_url.host_str() || redirect.port() != current_url.port() {
            warn!("422: host changed, redirecting browser to {redirect}");
            return Ok(Recovery::Navigate(redirect.to_string()));
        }

        if redirect.path() != current_url.path() {
            warn!("422: path changed");
            let path = match redirect.query() {
                Some(query) => format!("{}?{query}", redirect.path()),
                None => redirect.path().to_string(),
            };
            return Ok(Recovery::Redirect(path));
        }

        let flow_id = redirect
            .query_pairs()
            .find(|(key, _)| key == "flow")
            .map(|(_, value)| value.into_owned());

        match (flow_id, self.get_flow) {
            (Some(flow_id), Some(fetcher)) => {
                warn!("422: refetching flow {flow_id}");
                self.refetch(fetcher, &flow_id).await
            }
            _ => {
                warn!("422: redirecting browser to {redirect}");
                Ok(Recovery::Navigate(redirect.to_string()))
            }
        }
    }

    async fn refetch(
        &self,
        fetcher: &dyn FlowFetcher<T>,
        flow_id: &str,
    ) -> Result<Recovery<T>, SdkError> {
        match fetcher.fetch_flow(flow_id).await {
            Ok(flow) => Ok(Recovery::Refetched(flow)),
            Err(err) => {
                error!("failed to refetch flow {flow_id}: {err}");
                match &self.default_nav {
                    Some(nav) => Ok(Recovery::Redirect(nav.clone())),
                    None => Err(err),
                }
            }
        }
    }
}

/// Error page URL carrying the serialized error context.
#[must_use]
pub fn error_page(err: &SdkError, current_url: &Url, id: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("error", &err.context(current_url).to_string());
    if let Some(id) = id {
        query.append_pair("id", id);
    }
    format!("{}?{}", paths::ERROR, query.finish())
}

fn fatal_page(err: &SdkError, current_url: &Url) -> String {
    error_page(err, current_url, Some(err.error_id().unwrap_or("undefined")))
}
