pub mod dashboard;
pub mod error;
pub mod health;
pub use self::health::health;
pub mod login;
pub mod logout;
pub mod registration;
pub mod session;
pub use self::session::session;
pub mod verification;

// common functions for the flow pages
use super::{views::Toast, AppState, PortalError};
use crate::{
    paths,
    recovery::{ErrorHandler, Recovery},
    sdk::{BrowserCookie, BrowserFlowParams, Flow, FlowKind, FlowLoader, SdkError},
    store::ErrorStore,
};
use axum::{
    http::{header::SET_COOKIE, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use regex::Regex;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

/// `?flow=` of a form submission.
#[derive(Debug, Default, Deserialize)]
pub struct FlowQuery {
    pub flow: Option<String>,
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Empty query values count as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// 303 to `location`, forwarding the provider's cookies.
pub fn see_other(location: &str, set_cookies: Vec<HeaderValue>) -> Response {
    with_cookies(Redirect::to(location).into_response(), set_cookies)
}

pub fn with_cookies(mut response: Response, set_cookies: Vec<HeaderValue>) -> Response {
    for cookie in set_cookies {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Turns a recovery outcome into a response; flows are handed to `render`.
///
/// # Errors
/// Returns whatever `render` fails with.
pub fn resolve<R>(recovery: Recovery<Flow>, render: R) -> Result<Response, PortalError>
where
    R: FnOnce(Flow) -> Result<Response, PortalError>,
{
    match recovery {
        Recovery::Redirect(location) | Recovery::Navigate(location) => {
            Ok(Redirect::to(&location).into_response())
        }
        Recovery::SetFlow(flow) | Recovery::Refetched(flow) => render(flow),
    }
}

/// A flow page: its kind, its path, and the browser it is serving.
pub struct FlowPage<'a> {
    pub state: &'a AppState,
    pub kind: FlowKind,
    pub path: &'static str,
    pub cookie: Option<BrowserCookie>,
    pub current_url: Url,
}

impl<'a> FlowPage<'a> {
    pub fn new(
        state: &'a AppState,
        kind: FlowKind,
        path: &'static str,
        cookie: Option<BrowserCookie>,
        current_url: Url,
    ) -> Self {
        Self {
            state,
            kind,
            path,
            cookie,
            current_url,
        }
    }

    /// Recovers from `err` with the page's policy: refetch, replace, fall back to
    /// the page itself, and send anything else to the error page. Flows are
    /// handed to `render`, forwarding the cookies of any refetch.
    async fn recover<R>(&self, err: SdkError, render: R) -> Result<Response, PortalError>
    where
        R: FnOnce(Flow) -> Result<Response, PortalError> + Send,
    {
        let loader = FlowLoader::new(&self.state.sdk, self.kind, self.cookie.as_ref());
        let recovery = ErrorHandler::<Flow>::new()
            .with_get_flow(&loader)
            .with_set_flow()
            .with_default_nav(self.path)
            .with_fatal_to_error(true)
            .handle(err, &self.current_url)
            .await?;
        let response = resolve(recovery, render)?;
        Ok(with_cookies(response, loader.take_cookies().await))
    }

    /// Renders `?flow=<id>` when given, otherwise creates a browser flow and
    /// redirects to it.
    ///
    /// # Errors
    /// Returns an error if the flow cannot be rendered.
    #[instrument(skip(self, params, render), fields(kind = %self.kind))]
    pub async fn show<R>(
        &self,
        flow_id: Option<&str>,
        params: &BrowserFlowParams,
        render: R,
    ) -> Result<Response, PortalError>
    where
        R: FnOnce(Flow) -> Result<Response, PortalError> + Send,
    {
        if let Some(flow_id) = flow_id {
            return match self
                .state
                .sdk
                .get_flow(self.kind, flow_id, self.cookie.as_ref())
                .await
            {
                Ok(reply) => Ok(with_cookies(render(reply.body)?, reply.set_cookies)),
                Err(err) => self.recover(err, render).await,
            };
        }

        match self
            .state
            .sdk
            .create_browser_flow(self.kind, params, self.cookie.as_ref())
            .await
        {
            Ok(reply) => Ok(see_other(
                &paths::with_flow(self.path, &reply.body.id),
                reply.set_cookies,
            )),
            Err(err) => self.recover(err, render).await,
        }
    }

    /// Handles a failed submission: the first UI message becomes a toast and the
    /// error goes through recovery.
    ///
    /// # Errors
    /// Returns an error if the recovered flow cannot be rendered.
    pub async fn submit_failed<R>(&self, err: SdkError, render: R) -> Result<Response, PortalError>
    where
        R: FnOnce(Flow, Option<Toast>) -> Result<Response, PortalError> + Send,
    {
        let errors = ErrorStore::new();
        errors.report(&err);
        self.recover(err, |flow| render(flow, errors.take().map(Toast::from)))
            .await
    }
}
