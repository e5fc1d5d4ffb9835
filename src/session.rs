//! The signed-in user as the pages see it: the provider session plus the
//! profile kept by the users service.

use crate::sdk::{BrowserCookie, FrontendApi, Session};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, ToSchema)]
pub struct UserSession {
    pub session: Option<Session>,
    pub profile: Option<ProfileData>,
}

impl UserSession {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Custom user data stored outside the identity provider.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct ProfileData {
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    pub use_gravatar: bool,
}

/// Resolves the session of the browser request; any failure means "no session".
#[instrument(skip(api, cookie))]
pub async fn get_server_session(
    api: &FrontendApi,
    cookie: Option<&BrowserCookie>,
) -> Option<UserSession> {
    match api.to_session(cookie).await {
        Ok(session) => Some(UserSession {
            session: Some(session),
            profile: None,
        }),
        Err(err) => {
            debug!("no session: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn resolves_session_with_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/whoami"))
            .and(header("cookie", "ory_kratos_session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "s-1",
                "active": true,
                "authenticator_assurance_level": "aal1",
                "identity": {"id": "i-1", "schema_id": "default", "traits": {"email": "a@b.c"}}
            })))
            .mount(&server)
            .await;

        let api = FrontendApi::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let cookie = BrowserCookie::new("ory_kratos_session=abc");
        let user = get_server_session(&api, Some(&cookie)).await.unwrap();
        assert!(user.is_authenticated());
        let identity = user.session.and_then(|s| s.identity).unwrap();
        assert_eq!(identity.traits["email"], "a@b.c");
        assert!(user.profile.is_none());
    }

    #[tokio::test]
    async fn failures_mean_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/whoami"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"id": "session_inactive", "code": 401}
            })))
            .mount(&server)
            .await;

        let api = FrontendApi::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(get_server_session(&api, None).await.is_none());
    }

    #[test]
    fn profile_defaults_missing_fields() {
        let profile: ProfileData = serde_json::from_value(json!({"city": "Lima"})).unwrap();
        assert_eq!(profile.city, "Lima");
        assert!(!profile.use_gravatar);
        assert_eq!(profile.zipcode, "");
    }
}
