//! Askama page models. Each page extends `base.html`, which needs `app_name`
//! and an optional toast.

use crate::{
    paths,
    sdk::{Flow, FlowError, UiText},
    session::ProfileData,
    store::SessionState,
};
use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use serde_json::Value;

/// One-shot message taken from the error store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: u16,
}

impl From<(String, u16)> for Toast {
    fn from((message, kind): (String, u16)) -> Self {
        Self { message, kind }
    }
}

/// A provider flow rendered as a form posting back to the portal.
#[derive(Clone, Debug)]
pub struct FlowForm {
    pub action: String,
    pub flow: Flow,
}

impl FlowForm {
    #[must_use]
    pub fn new(path: &str, flow: Flow) -> Self {
        Self {
            action: paths::with_flow(path, &flow.id),
            flow,
        }
    }

    pub fn csrf_token(&self) -> &str {
        self.flow.csrf_token().unwrap_or_default()
    }

    pub fn messages(&self) -> &[UiText] {
        &self.flow.ui.messages
    }

    pub fn errors_for(&self, name: &str) -> Vec<String> {
        self.flow
            .field_messages(name)
            .map(|message| message.text.clone())
            .collect()
    }

    /// Value the provider echoed back for a field, empty when none.
    pub fn value_of(&self, name: &str) -> String {
        self.flow
            .ui
            .nodes
            .iter()
            .find(|node| node.attributes.name.as_deref() == Some(name))
            .and_then(|node| node.attributes.value.as_ref())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn state(&self) -> &str {
        self.flow.state.as_deref().unwrap_or_default()
    }
}

/// Renders a template into an HTML response.
///
/// # Errors
/// Returns the askama error when rendering fails.
pub fn html<T: Template>(page: &T) -> Result<Response, askama::Error> {
    Ok(Html(page.render()?).into_response())
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage<'a> {
    pub app_name: &'a str,
    pub toast: Option<Toast>,
    pub form: FlowForm,
    pub registration_path: &'a str,
    pub refresh: bool,
    pub aal2: bool,
}

#[derive(Template)]
#[template(path = "registration.html")]
pub struct RegistrationPage<'a> {
    pub app_name: &'a str,
    pub toast: Option<Toast>,
    pub form: FlowForm,
    pub login_path: &'a str,
}

#[derive(Template)]
#[template(path = "verification.html")]
pub struct VerificationPage<'a> {
    pub app_name: &'a str,
    pub toast: Option<Toast>,
    pub form: FlowForm,
    /// Code from the email link, prefilled in the form.
    pub code: String,
    pub continue_to: String,
}

impl VerificationPage<'_> {
    pub fn passed(&self) -> bool {
        self.form.flow.has_state("passed_challenge")
    }

    pub fn choosing(&self) -> bool {
        self.form.flow.has_state("choose_method")
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage<'a> {
    pub app_name: &'a str,
    pub toast: Option<Toast>,
    pub identity_id: String,
    pub traits: String,
    pub aal: String,
    pub expires_at: String,
    pub profile: Option<ProfileData>,
    pub logout_path: &'a str,
}

impl<'a> DashboardPage<'a> {
    #[must_use]
    pub fn new(app_name: &'a str, state: &SessionState) -> Self {
        let session = state.session.as_ref();
        let identity = session.and_then(|session| session.identity.as_ref());
        Self {
            app_name,
            toast: state.error.clone().map(|message| Toast { message, kind: 502 }),
            identity_id: identity.map(|identity| identity.id.clone()).unwrap_or_default(),
            traits: identity
                .and_then(|identity| serde_json::to_string_pretty(&identity.traits).ok())
                .unwrap_or_default(),
            aal: session
                .and_then(|session| session.authenticator_assurance_level.clone())
                .unwrap_or_default(),
            expires_at: session
                .and_then(|session| session.expires_at.clone())
                .unwrap_or_default(),
            profile: state.profile.clone(),
            logout_path: paths::LOGOUT,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub app_name: &'a str,
    pub toast: Option<Toast>,
    pub status: Option<u16>,
    pub message: String,
    pub details: String,
    pub id: Option<String>,
    pub home_path: &'a str,
}

impl<'a> ErrorPage<'a> {
    #[must_use]
    pub fn new(app_name: &'a str, message: impl Into<String>) -> Self {
        Self {
            app_name,
            toast: None,
            status: None,
            message: message.into(),
            details: String::new(),
            id: None,
            home_path: paths::HOME,
        }
    }

    /// Fills the page from the `error=` context built by the recovery handler.
    #[must_use]
    pub fn with_context(mut self, context: &Value) -> Self {
        self.status = context
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
            .filter(|status| *status > 0);
        if let Some(message) = context
            .pointer("/data/error/message")
            .or_else(|| context.pointer("/data/error/reason"))
            .or_else(|| context.get("statusText"))
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
        {
            self.message = message.to_string();
        }
        self.details = serde_json::to_string_pretty(context).unwrap_or_default();
        self
    }

    /// Uses the error stored by the provider.
    #[must_use]
    pub fn with_flow_error(mut self, flow_error: &FlowError) -> Self {
        if let Some(message) = flow_error
            .error
            .get("message")
            .or_else(|| flow_error.error.get("reason"))
            .and_then(Value::as_str)
        {
            self.message = message.to_string();
        }
        self.status = flow_error
            .error
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .or(self.status);
        self.details = serde_json::to_string_pretty(&flow_error.error).unwrap_or_default();
        self.id = Some(flow_error.id.clone());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id.or(self.id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow() -> Flow {
        serde_json::from_value(json!({
            "id": "f-1",
            "state": "sent_email",
            "ui": {
                "action": "http://kratos/self-service/verification?flow=f-1",
                "method": "POST",
                "nodes": [
                    {"type": "input", "group": "default", "attributes": {"name": "csrf_token", "type": "hidden", "value": "tok"}},
                    {"type": "input", "group": "code", "attributes": {"name": "email", "type": "email", "value": "a@b.c"},
                     "messages": [{"id": 4000001, "text": "bad email", "type": "error"}]}
                ],
                "messages": [{"id": 1080003, "text": "An email containing a verification code has been sent.", "type": "info"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn flow_form_posts_back_to_page() {
        let form = FlowForm::new(paths::VERIFICATION, flow());
        assert_eq!(form.action, "/verification?flow=f-1");
        assert_eq!(form.csrf_token(), "tok");
        assert_eq!(form.value_of("email"), "a@b.c");
        assert_eq!(form.value_of("code"), "");
        assert_eq!(form.errors_for("email"), vec!["bad email".to_string()]);
        assert_eq!(form.state(), "sent_email");
    }

    #[test]
    fn verification_page_renders_code_form() {
        let page = VerificationPage {
            app_name: "Acme",
            toast: Some(Toast::from(("slow down".to_string(), 429))),
            form: FlowForm::new(paths::VERIFICATION, flow()),
            code: "123456".to_string(),
            continue_to: paths::DASHBOARD.to_string(),
        };
        let html = page.render().unwrap();
        assert!(html.contains("Acme"));
        assert!(html.contains("slow down"));
        assert!(html.contains("value=\"123456\""));
        assert!(html.contains("verification?flow=f-1"));
        assert!(html.contains("An email containing a verification code has been sent."));
    }

    #[test]
    fn error_page_reads_recovery_context() {
        let context = json!({
            "data": {"error": {"id": "security_csrf_violation", "code": 403, "reason": "csrf mismatch"}},
            "status": 403,
            "statusText": "Forbidden",
            "url": "http://localhost:8080/?flow=x"
        });
        let page = ErrorPage::new("Acme", "Something went wrong").with_context(&context);
        assert_eq!(page.status, Some(403));
        assert_eq!(page.message, "csrf mismatch");
        assert!(page.details.contains("security_csrf_violation"));

        let transport = json!({"data": "unreachable", "status": 0, "statusText": "", "url": "x"});
        let page = ErrorPage::new("Acme", "Something went wrong").with_context(&transport);
        assert_eq!(page.status, None);
        assert_eq!(page.message, "Something went wrong");
    }

    #[test]
    fn error_page_uses_stored_flow_error() {
        let flow_error: FlowError = serde_json::from_value(json!({
            "id": "7d2c5b5e-9a1f-4a53-9b4b-0f1e2d3c4b5a",
            "error": {"code": 500, "message": "no such table"}
        }))
        .unwrap();
        let page = ErrorPage::new("Acme", "Something went wrong").with_flow_error(&flow_error);
        assert_eq!(page.status, Some(500));
        assert_eq!(page.message, "no such table");
        assert_eq!(
            page.id.as_deref(),
            Some("7d2c5b5e-9a1f-4a53-9b4b-0f1e2d3c4b5a")
        );
        let html = page.render().unwrap();
        assert!(html.contains("no such table"));
    }
}
