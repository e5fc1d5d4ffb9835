use super::{non_empty, see_other, FlowPage, FlowQuery};
use crate::{
    paths,
    portal::{
        views::{self, FlowForm, LoginPage, Toast},
        AppState, PortalError,
    },
    sdk::{
        redirect_target, BrowserCookie, BrowserFlowParams, Flow, FlowKind, LoginSuccess,
        UpdateLoginFlowBody,
    },
    session::get_server_session,
};
use axum::{
    extract::{Extension, Form, Query},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    flow: Option<String>,
    return_to: Option<String>,
    refresh: Option<String>,
    aal: Option<String>,
    aal2: Option<String>,
}

impl LoginQuery {
    fn wants_aal2(&self) -> bool {
        self.aal.as_deref().is_some_and(|aal| !aal.is_empty())
            || self.aal2.as_deref().is_some_and(|aal2| !aal2.is_empty())
    }

    fn wants_refresh(&self) -> bool {
        self.refresh.as_deref().is_some_and(|refresh| !refresh.is_empty())
    }

    fn params(&self) -> BrowserFlowParams {
        BrowserFlowParams {
            return_to: non_empty(self.return_to.clone()),
            refresh: Some(self.wants_refresh()),
            aal: Some(if self.wants_aal2() { "aal2" } else { "aal1" }.to_string()),
        }
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    identifier: String,
    #[serde(default)]
    password: String,
}

fn render(state: &AppState, flow: Flow, toast: Option<Toast>) -> Result<Response, PortalError> {
    let page = LoginPage {
        app_name: state.config.app_name(),
        toast,
        refresh: flow.refresh.unwrap_or(false),
        aal2: flow.requested_aal.as_deref() == Some("aal2"),
        form: FlowForm::new(paths::LOGIN, flow),
        registration_path: paths::REGISTRATION,
    };
    Ok(views::html(&page)?)
}

/// Login page, also the landing page.
#[instrument(skip(state, headers, query))]
pub async fn show(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<LoginQuery>,
) -> Result<Response, PortalError> {
    let page = FlowPage::new(
        &state,
        FlowKind::Login,
        paths::LOGIN,
        BrowserCookie::from_headers(&headers),
        state.current_url(&uri),
    );
    let flow_id = non_empty(query.flow.clone());

    // "/" is also home: a signed-in browser would bounce on session_already_available
    if flow_id.is_none()
        && page.cookie.is_some()
        && !query.wants_refresh()
        && !query.wants_aal2()
        && get_server_session(&state.sdk, page.cookie.as_ref()).await.is_some()
    {
        return Ok(Redirect::to(paths::DASHBOARD).into_response());
    }

    page.show(flow_id.as_deref(), &query.params(), |flow| {
        render(&state, flow, None)
    })
    .await
}

#[instrument(skip(state, headers, form))]
pub async fn submit(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<FlowQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PortalError> {
    let Some(flow_id) = non_empty(query.flow) else {
        return Ok(Redirect::to(paths::LOGIN).into_response());
    };

    let page = FlowPage::new(
        &state,
        FlowKind::Login,
        paths::LOGIN,
        BrowserCookie::from_headers(&headers),
        state.current_url(&uri),
    );
    let body = UpdateLoginFlowBody::password(form.csrf_token, form.identifier, form.password);

    match state
        .sdk
        .update_flow::<_, LoginSuccess>(FlowKind::Login, &flow_id, &body, page.cookie.as_ref())
        .await
    {
        Ok(reply) => {
            debug!("login flow {flow_id} completed");
            let target = redirect_target(&reply.body.continue_with).unwrap_or(paths::DASHBOARD);
            Ok(see_other(target, reply.set_cookies))
        }
        Err(err) => {
            page.submit_failed(err, |flow, toast| render(&state, flow, toast))
                .await
        }
    }
}
