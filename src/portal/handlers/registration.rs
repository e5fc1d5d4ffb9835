use super::{non_empty, see_other, valid_email, with_cookies, FlowPage, FlowQuery};
use crate::{
    paths,
    portal::{
        views::{self, FlowForm, RegistrationPage, Toast},
        AppState, PortalError,
    },
    sdk::{
        verification_flow, BrowserCookie, BrowserFlowParams, Flow, FlowKind, RegistrationSuccess,
        UpdateRegistrationFlowBody,
    },
};
use axum::{
    extract::{Extension, Form, Query},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationQuery {
    flow: Option<String>,
    return_to: Option<String>,
}

#[derive(Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm: String,
}

impl RegistrationForm {
    /// Checks done before bothering the provider.
    fn problem(&self) -> Option<&'static str> {
        if self.password != self.confirm {
            return Some("Passwords don't match");
        }
        if !valid_email(self.email.trim()) {
            return Some("Invalid email address");
        }
        None
    }

    fn traits(&self) -> Value {
        json!({
            "email": self.email.trim(),
            "username": self.username.trim(),
            "name": {
                "first": self.first_name.trim(),
                "last": self.last_name.trim(),
            },
        })
    }
}

fn render(state: &AppState, flow: Flow, toast: Option<Toast>) -> Result<Response, PortalError> {
    let page = RegistrationPage {
        app_name: state.config.app_name(),
        toast,
        form: FlowForm::new(paths::REGISTRATION, flow),
        login_path: paths::LOGIN,
    };
    Ok(views::html(&page)?)
}

#[instrument(skip(state, headers, query))]
pub async fn show(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<RegistrationQuery>,
) -> Result<Response, PortalError> {
    let page = FlowPage::new(
        &state,
        FlowKind::Registration,
        paths::REGISTRATION,
        BrowserCookie::from_headers(&headers),
        state.current_url(&uri),
    );
    let params = BrowserFlowParams {
        return_to: non_empty(query.return_to),
        ..BrowserFlowParams::default()
    };
    let flow_id = non_empty(query.flow);

    page.show(flow_id.as_deref(), &params, |flow| render(&state, flow, None))
        .await
}

#[instrument(skip(state, headers, form))]
pub async fn submit(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<FlowQuery>,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, PortalError> {
    let Some(flow_id) = non_empty(query.flow) else {
        return Ok(Redirect::to(paths::REGISTRATION).into_response());
    };

    let page = FlowPage::new(
        &state,
        FlowKind::Registration,
        paths::REGISTRATION,
        BrowserCookie::from_headers(&headers),
        state.current_url(&uri),
    );

    if let Some(problem) = form.problem() {
        debug!("registration rejected locally: {problem}");
        let toast = Toast {
            message: problem.to_string(),
            kind: StatusCode::BAD_REQUEST.as_u16(),
        };
        return match state
            .sdk
            .get_flow(FlowKind::Registration, &flow_id, page.cookie.as_ref())
            .await
        {
            Ok(reply) => Ok(with_cookies(
                render(&state, reply.body, Some(toast))?,
                reply.set_cookies,
            )),
            Err(err) => {
                page.submit_failed(err, |flow, _| render(&state, flow, Some(toast)))
                    .await
            }
        };
    }

    let traits = form.traits();
    let body = UpdateRegistrationFlowBody::password(form.csrf_token, form.password, traits);

    match state
        .sdk
        .update_flow::<_, RegistrationSuccess>(
            FlowKind::Registration,
            &flow_id,
            &body,
            page.cookie.as_ref(),
        )
        .await
    {
        Ok(reply) => {
            let identity_id = reply.body.identity.id.clone();
            debug!("identity {identity_id} registered");

            if let Some(profiles) = &state.profiles {
                profiles.spawn_create(identity_id);
            }

            let target = verification_flow(&reply.body.continue_with).map_or_else(
                || paths::HOME.to_string(),
                |id| paths::with_flow(paths::VERIFICATION, id),
            );
            Ok(see_other(&target, reply.set_cookies))
        }
        Err(err) => {
            page.submit_failed(err, |flow, toast| render(&state, flow, toast))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str, email: &str) -> RegistrationForm {
        RegistrationForm {
            csrf_token: "tok".to_string(),
            email: email.to_string(),
            username: " alice ".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            password: password.to_string(),
            confirm: confirm.to_string(),
        }
    }

    #[test]
    fn passwords_must_match() {
        assert_eq!(
            form("a", "b", "alice@example.com").problem(),
            Some("Passwords don't match")
        );
    }

    #[test]
    fn email_must_look_like_one() {
        assert_eq!(
            form("a", "a", "alice").problem(),
            Some("Invalid email address")
        );
        assert_eq!(form("a", "a", "alice@example.com").problem(), None);
    }

    #[test]
    fn traits_follow_identity_schema() {
        assert_eq!(
            form("a", "a", "alice@example.com").traits(),
            json!({
                "email": "alice@example.com",
                "username": "alice",
                "name": {"first": "Alice", "last": "Liddell"}
            })
        );
    }
}
