use super::{non_empty, see_other, with_cookies, FlowPage, FlowQuery};
use crate::{
    paths,
    portal::{
        views::{self, FlowForm, Toast, VerificationPage},
        AppState, PortalError,
    },
    sdk::{BrowserCookie, BrowserFlowParams, Flow, FlowKind, UpdateVerificationFlowBody},
};
use axum::{
    extract::{Extension, Form, Query},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

const PASSED_CHALLENGE: &str = "passed_challenge";

#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    flow: Option<String>,
    return_to: Option<String>,
    code: Option<String>,
}

#[derive(Deserialize)]
pub struct VerificationForm {
    #[serde(default)]
    csrf_token: String,
    code: Option<String>,
    email: Option<String>,
}

impl VerificationForm {
    /// A code wins over an email; an email alone asks for a new code.
    fn into_body(self) -> UpdateVerificationFlowBody {
        match (non_empty(self.code), non_empty(self.email)) {
            (None, Some(email)) => UpdateVerificationFlowBody::email(self.csrf_token, email),
            (code, _) => UpdateVerificationFlowBody::code(self.csrf_token, code.unwrap_or_default()),
        }
    }
}

/// Where the "continue" link of a verified flow leads.
fn continue_to(flow: &Flow) -> String {
    flow.first_link()
        .or(flow.return_to.as_deref())
        .unwrap_or(paths::DASHBOARD)
        .to_string()
}

fn render(
    state: &AppState,
    flow: Flow,
    code: String,
    toast: Option<Toast>,
) -> Result<Response, PortalError> {
    let page = VerificationPage {
        app_name: state.config.app_name(),
        toast,
        code,
        continue_to: continue_to(&flow),
        form: FlowForm::new(paths::VERIFICATION, flow),
    };
    Ok(views::html(&page)?)
}

#[instrument(skip(state, headers, query))]
pub async fn show(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<VerificationQuery>,
) -> Result<Response, PortalError> {
    let page = FlowPage::new(
        &state,
        FlowKind::Verification,
        paths::VERIFICATION,
        BrowserCookie::from_headers(&headers),
        state.current_url(&uri),
    );
    let params = BrowserFlowParams {
        return_to: non_empty(query.return_to),
        ..BrowserFlowParams::default()
    };
    let flow_id = non_empty(query.flow);
    let code = non_empty(query.code).unwrap_or_default();

    page.show(flow_id.as_deref(), &params, |flow| {
        render(&state, flow, code, None)
    })
    .await
}

#[instrument(skip(state, headers, form))]
pub async fn submit(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<FlowQuery>,
    Form(form): Form<VerificationForm>,
) -> Result<Response, PortalError> {
    let Some(flow_id) = non_empty(query.flow) else {
        return Ok(Redirect::to(paths::VERIFICATION).into_response());
    };

    let page = FlowPage::new(
        &state,
        FlowKind::Verification,
        paths::VERIFICATION,
        BrowserCookie::from_headers(&headers),
        state.current_url(&uri),
    );
    let body = form.into_body();

    match state
        .sdk
        .update_flow::<_, Flow>(FlowKind::Verification, &flow_id, &body, page.cookie.as_ref())
        .await
    {
        Ok(reply) if reply.body.has_state(PASSED_CHALLENGE) => {
            debug!("verification flow {flow_id} passed");
            let target = reply
                .body
                .return_to
                .as_deref()
                .filter(|target| !target.is_empty())
                .unwrap_or(paths::DASHBOARD);
            Ok(see_other(target, reply.set_cookies))
        }
        Ok(reply) => Ok(with_cookies(
            render(&state, reply.body, String::new(), None)?,
            reply.set_cookies,
        )),
        Err(err) => {
            page.submit_failed(err, |flow, toast| {
                render(&state, flow, String::new(), toast)
            })
            .await
        }
    }
}
