//! Client for the identity provider's public (frontend) API.
//!
//! Requests carry the browser's `Cookie` header so the provider can bind flows
//! and sessions to it, and every `Set-Cookie` header it answers with is handed
//! back to the caller to be forwarded to the browser. Bodies are always JSON:
//! `Accept: application/json` makes browser endpoints answer with the flow
//! instead of a redirect.

pub mod error;
pub mod types;

pub use self::error::SdkError;
pub use self::types::*;

use crate::{recovery::FlowFetcher, APP_USER_AGENT};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, SET_COOKIE},
    Client, Method, RequestBuilder,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{fmt, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

/// The self-service flows the portal drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowKind {
    Login,
    Registration,
    Verification,
}

impl FlowKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Registration => "registration",
            Self::Verification => "verification",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters accepted when a browser flow is created.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BrowserFlowParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aal: Option<String>,
}

/// The `Cookie` header of the browser request being served.
#[derive(Clone, Debug)]
pub struct BrowserCookie(SecretString);

impl BrowserCookie {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Reads the `Cookie` header, `None` when absent or empty.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .map(Self::new)
    }

    fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// A successful answer and the cookies the provider wants the browser to store.
#[derive(Clone, Debug)]
pub struct Reply<T> {
    pub body: T,
    pub set_cookies: Vec<HeaderValue>,
}

#[derive(Clone, Debug)]
pub struct FrontendApi {
    client: Client,
    base_url: String,
}

impl FrontendApi {
    /// Builds a client for the provider at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SdkError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)?;

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(SdkError::Transport)?;

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Initializes a browser flow.
    ///
    /// # Errors
    /// Returns the provider error or a transport failure.
    #[instrument(skip(self, cookie))]
    pub async fn create_browser_flow(
        &self,
        kind: FlowKind,
        params: &BrowserFlowParams,
        cookie: Option<&BrowserCookie>,
    ) -> Result<Reply<Flow>, SdkError> {
        let url = self.endpoint(&format!("/self-service/{kind}/browser"))?;
        let request = self.request(Method::GET, url, cookie).query(params);
        self.send(request).await
    }

    /// Fetches an existing flow by id.
    ///
    /// # Errors
    /// Returns the provider error (404, 403 on CSRF mismatch, 410 when expired).
    #[instrument(skip(self, cookie))]
    pub async fn get_flow(
        &self,
        kind: FlowKind,
        id: &str,
        cookie: Option<&BrowserCookie>,
    ) -> Result<Reply<Flow>, SdkError> {
        let url = self.endpoint(&format!("/self-service/{kind}/flows"))?;
        let request = self
            .request(Method::GET, url, cookie)
            .query(&[("id", id)]);
        self.send(request).await
    }

    /// Submits a flow form.
    ///
    /// # Errors
    /// Returns the provider error; a 400 carries the flow with validation messages.
    #[instrument(skip(self, body, cookie))]
    pub async fn update_flow<B, R>(
        &self,
        kind: FlowKind,
        flow_id: &str,
        body: &B,
        cookie: Option<&BrowserCookie>,
    ) -> Result<Reply<R>, SdkError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(&format!("/self-service/{kind}"))?;
        let request = self
            .request(Method::POST, url, cookie)
            .query(&[("flow", flow_id)])
            .json(body);
        self.send(request).await
    }

    /// Resolves the session bound to the browser cookie.
    ///
    /// # Errors
    /// Returns a 401 provider error when there is no valid session.
    #[instrument(skip(self, cookie))]
    pub async fn to_session(&self, cookie: Option<&BrowserCookie>) -> Result<Session, SdkError> {
        let url = self.endpoint("/sessions/whoami")?;
        let request = self.request(Method::GET, url, cookie);
        self.send(request).await.map(|reply| reply.body)
    }

    /// Creates the logout URL for the browser session.
    ///
    /// # Errors
    /// Returns a 401 provider error when there is no session to end.
    #[instrument(skip(self, cookie))]
    pub async fn create_browser_logout_flow(
        &self,
        return_to: Option<&str>,
        cookie: Option<&BrowserCookie>,
    ) -> Result<LogoutFlow, SdkError> {
        let url = self.endpoint("/self-service/logout/browser")?;
        let mut request = self.request(Method::GET, url, cookie);
        if let Some(return_to) = return_to {
            request = request.query(&[("return_to", return_to)]);
        }
        self.send(request).await.map(|reply| reply.body)
    }

    /// Fetches an error the provider stored for its error UI.
    ///
    /// # Errors
    /// Returns the provider error, typically 404 for unknown ids.
    #[instrument(skip(self))]
    pub async fn get_flow_error(&self, id: &str) -> Result<FlowError, SdkError> {
        let url = self.endpoint("/self-service/errors")?;
        let request = self.request(Method::GET, url, None).query(&[("id", id)]);
        self.send(request).await.map(|reply| reply.body)
    }

    /// Liveness of the provider.
    pub async fn is_alive(&self) -> bool {
        let Ok(url) = self.endpoint("/health/alive") else {
            return false;
        };
        match self.request(Method::GET, url, None).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("identity provider health check failed: {err}");
                false
            }
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, SdkError> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }

    fn request(&self, method: Method, url: Url, cookie: Option<&BrowserCookie>) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie.expose());
        }
        request
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Reply<T>, SdkError> {
        let response = request.send().await.map_err(SdkError::Transport)?;
        let status = response.status();
        let set_cookies: Vec<HeaderValue> =
            response.headers().get_all(SET_COOKIE).iter().cloned().collect();
        let bytes = response.bytes().await.map_err(SdkError::Transport)?;

        if !status.is_success() {
            debug!("identity provider responded {status}");
            let data = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            return Err(SdkError::response(status, data));
        }

        let body = serde_json::from_slice(&bytes).map_err(SdkError::Decode)?;
        Ok(Reply { body, set_cookies })
    }
}

/// Refetches flows of one kind on behalf of the recovery handler.
///
/// Cookies set by the refetches are kept until [`FlowLoader::take_cookies`].
pub struct FlowLoader<'a> {
    api: &'a FrontendApi,
    kind: FlowKind,
    cookie: Option<&'a BrowserCookie>,
    set_cookies: Mutex<Vec<HeaderValue>>,
}

impl<'a> FlowLoader<'a> {
    #[must_use]
    pub fn new(api: &'a FrontendApi, kind: FlowKind, cookie: Option<&'a BrowserCookie>) -> Self {
        Self {
            api,
            kind,
            cookie,
            set_cookies: Mutex::new(Vec::new()),
        }
    }

    /// `Set-Cookie` headers collected so far.
    pub async fn take_cookies(&self) -> Vec<HeaderValue> {
        std::mem::take(&mut *self.set_cookies.lock().await)
    }
}

#[async_trait]
impl FlowFetcher<Flow> for FlowLoader<'_> {
    async fn fetch_flow(&self, id: &str) -> Result<Flow, SdkError> {
        let reply = self.api.get_flow(self.kind, id, self.cookie).await?;
        self.set_cookies.lock().await.extend(reply.set_cookies);
        Ok(reply.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn flow_json(id: &str) -> Value {
        json!({
            "id": id,
            "type": "browser",
            "ui": {
                "action": format!("http://kratos/self-service/login?flow={id}"),
                "method": "POST",
                "nodes": [{
                    "type": "input",
                    "group": "default",
                    "attributes": {"name": "csrf_token", "type": "hidden", "value": "csrf-1", "node_type": "input"},
                    "messages": [],
                    "meta": {}
                }],
                "messages": []
            }
        })
    }

    fn api(server: &MockServer) -> FrontendApi {
        FrontendApi::new(&format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn create_browser_flow_forwards_cookies_both_ways() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/self-service/login/browser"))
            .and(query_param("aal", "aal2"))
            .and(query_param("return_to", "https://app.example/after"))
            .and(header("accept", "application/json"))
            .and(header("cookie", "csrf=abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(flow_json("f-1"))
                    .append_header("set-cookie", "csrf_token_x=1; Path=/; HttpOnly"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let params = BrowserFlowParams {
            return_to: Some("https://app.example/after".to_string()),
            refresh: None,
            aal: Some("aal2".to_string()),
        };
        let cookie = BrowserCookie::new("csrf=abc");
        let reply = api(&server)
            .create_browser_flow(FlowKind::Login, &params, Some(&cookie))
            .await
            .unwrap();

        assert_eq!(reply.body.id, "f-1");
        assert_eq!(reply.body.csrf_token(), Some("csrf-1"));
        assert_eq!(reply.set_cookies.len(), 1);
        assert_eq!(
            reply.set_cookies[0].to_str().unwrap(),
            "csrf_token_x=1; Path=/; HttpOnly"
        );
    }

    #[tokio::test]
    async fn error_answers_keep_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/self-service/registration/flows"))
            .and(query_param("id", "old"))
            .respond_with(ResponseTemplate::new(410).set_body_json(json!({
                "error": {"id": "self_service_flow_expired", "code": 410},
                "use_flow_id": "new"
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .get_flow(FlowKind::Registration, "old", None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::GONE));
        assert_eq!(err.error_id(), Some("self_service_flow_expired"));
        assert_eq!(err.use_flow_id(), Some("new"));
    }

    #[tokio::test]
    async fn non_json_error_body_becomes_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/whoami"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = api(&server).to_session(None).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.data(), Some(&Value::Null));
    }

    #[tokio::test]
    async fn update_flow_posts_json_with_flow_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/self-service/login"))
            .and(query_param("flow", "f-1"))
            .and(body_json(json!({
                "method": "password",
                "csrf_token": "csrf-1",
                "identifier": "alice",
                "password": "secret"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "session": {"id": "s-1", "active": true},
                        "continue_with": [{"action": "redirect_browser_to", "redirect_browser_to": "https://app.example/x"}]
                    }))
                    .append_header("set-cookie", "ory_kratos_session=zzz; Path=/; HttpOnly"),
            )
            .mount(&server)
            .await;

        let body = UpdateLoginFlowBody::password("csrf-1".into(), "alice".into(), "secret".into());
        let reply: Reply<LoginSuccess> = api(&server)
            .update_flow(FlowKind::Login, "f-1", &body, None)
            .await
            .unwrap();

        assert_eq!(reply.body.session.id, "s-1");
        assert_eq!(
            redirect_target(&reply.body.continue_with),
            Some("https://app.example/x")
        );
        assert_eq!(reply.set_cookies.len(), 1);
    }

    #[tokio::test]
    async fn logout_flow_passes_return_to() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/self-service/logout/browser"))
            .and(query_param("return_to", "/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "logout_url": "http://kratos/self-service/logout?token=t",
                "logout_token": "t"
            })))
            .mount(&server)
            .await;

        let flow = api(&server)
            .create_browser_logout_flow(Some("/"), Some(&BrowserCookie::new("s=1")))
            .await
            .unwrap();
        assert_eq!(flow.logout_url, "http://kratos/self-service/logout?token=t");
    }

    #[tokio::test]
    async fn decode_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/whoami"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nope": true})))
            .mount(&server)
            .await;

        let err = api(&server).to_session(None).await.unwrap_err();
        assert!(matches!(err, SdkError::Decode(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn flow_loader_fetches_by_kind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/self-service/verification/flows"))
            .and(query_param("id", "v-9"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(flow_json("v-9"))
                    .append_header("set-cookie", "csrf_token_v=abc; Path=/; HttpOnly"),
            )
            .mount(&server)
            .await;

        let api = api(&server);
        let loader = FlowLoader::new(&api, FlowKind::Verification, None);
        let flow = loader.fetch_flow("v-9").await.unwrap();
        assert_eq!(flow.id, "v-9");
        assert_eq!(
            loader.take_cookies().await,
            vec![HeaderValue::from_static("csrf_token_v=abc; Path=/; HttpOnly")]
        );
        assert!(loader.take_cookies().await.is_empty());
    }

    #[test]
    fn browser_cookie_ignores_empty_header() {
        let mut headers = HeaderMap::new();
        assert!(BrowserCookie::from_headers(&headers).is_none());
        headers.insert(COOKIE, HeaderValue::from_static("  "));
        assert!(BrowserCookie::from_headers(&headers).is_none());
        headers.insert(COOKIE, HeaderValue::from_static("a=1"));
        let cookie = BrowserCookie::from_headers(&headers).unwrap();
        assert_eq!(cookie.expose(), "a=1");
        assert!(!format!("{cookie:?}").contains("a=1"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            FrontendApi::new("not a url", Duration::from_secs(1)),
            Err(SdkError::Url(_))
        ));
    }
}
