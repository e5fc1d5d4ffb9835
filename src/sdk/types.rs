//! Provider payloads. The portal only reads a few fields of each; everything
//! else is passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// A self-service flow (login, registration or verification).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Flow {
    pub id: String,
    #[serde(rename = "type", default)]
    pub flow_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_aal: Option<String>,
    pub ui: UiContainer,
}

impl Flow {
    /// Value of the hidden `csrf_token` node.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.ui
            .nodes
            .iter()
            .find(|node| node.attributes.name.as_deref() == Some("csrf_token"))
            .and_then(|node| node.attributes.value.as_ref())
            .and_then(Value::as_str)
    }

    /// First flow-level message, if any.
    #[must_use]
    pub fn first_message(&self) -> Option<&UiText> {
        self.ui.messages.first()
    }

    /// Messages attached to the input node with the given name.
    pub fn field_messages<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UiText> + 'a {
        self.ui
            .nodes
            .iter()
            .filter(move |node| node.attributes.name.as_deref() == Some(name))
            .flat_map(|node| node.messages.iter())
    }

    /// Target of the first anchor node, used by the verification "continue" link.
    #[must_use]
    pub fn first_link(&self) -> Option<&str> {
        self.ui
            .nodes
            .iter()
            .find(|node| node.attributes.node_type.as_deref() == Some("a"))
            .and_then(|node| node.attributes.href.as_deref())
    }

    #[must_use]
    pub fn has_state(&self, state: &str) -> bool {
        self.state.as_deref() == Some(state)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct UiContainer {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub nodes: Vec<UiNode>,
    #[serde(default)]
    pub messages: Vec<UiText>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct UiNode {
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub attributes: UiNodeAttributes,
    #[serde(default)]
    pub messages: Vec<UiText>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

/// Union of the attribute shapes of input, anchor, image, text and script nodes.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct UiNodeAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct UiText {
    #[serde(default)]
    pub id: i64,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl UiText {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == "error"
    }
}

/// Authenticated browser context.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, ToSchema)]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_assurance_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, ToSchema)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub schema_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub traits: Value,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LogoutFlow {
    pub logout_url: String,
    #[serde(default)]
    pub logout_token: String,
}

/// Error stored by the provider and shown through the error UI (`?id=`).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FlowError {
    pub id: String,
    #[serde(default)]
    pub error: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Follow-up actions returned after a successful submit.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContinueWith {
    ShowVerificationUi { flow: ContinueWithFlow },
    RedirectBrowserTo { redirect_browser_to: String },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ContinueWithFlow {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifiable_address: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoginSuccess {
    pub session: Session,
    #[serde(default)]
    pub continue_with: Vec<ContinueWith>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RegistrationSuccess {
    pub identity: Identity,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub continue_with: Vec<ContinueWith>,
}

/// First `redirect_browser_to` continuation, if the provider sent one.
#[must_use]
pub fn redirect_target(continue_with: &[ContinueWith]) -> Option<&str> {
    continue_with.iter().find_map(|action| match action {
        ContinueWith::RedirectBrowserTo {
            redirect_browser_to,
        } => Some(redirect_browser_to.as_str()),
        _ => None,
    })
}

/// Flow id of the first `show_verification_ui` continuation.
#[must_use]
pub fn verification_flow(continue_with: &[ContinueWith]) -> Option<&str> {
    continue_with.iter().find_map(|action| match action {
        ContinueWith::ShowVerificationUi { flow } => Some(flow.id.as_str()),
        _ => None,
    })
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateLoginFlowBody {
    pub method: &'static str,
    pub csrf_token: String,
    pub identifier: String,
    pub password: String,
}

impl UpdateLoginFlowBody {
    #[must_use]
    pub fn password(csrf_token: String, identifier: String, password: String) -> Self {
        Self {
            method: "password",
            csrf_token,
            identifier,
            password,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateRegistrationFlowBody {
    pub method: &'static str,
    pub csrf_token: String,
    pub password: String,
    pub traits: Value,
}

impl UpdateRegistrationFlowBody {
    #[must_use]
    pub fn password(csrf_token: String, password: String, traits: Value) -> Self {
        Self {
            method: "password",
            csrf_token,
            password,
            traits,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateVerificationFlowBody {
    pub method: &'static str,
    pub csrf_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UpdateVerificationFlowBody {
    /// Submits a code received by email.
    #[must_use]
    pub fn code(csrf_token: String, code: String) -> Self {
        Self {
            method: "code",
            csrf_token,
            code: Some(code),
            email: None,
        }
    }

    /// Asks the provider to send a code to the address.
    #[must_use]
    pub fn email(csrf_token: String, email: String) -> Self {
        Self {
            method: "code",
            csrf_token,
            code: None,
            email: Some(email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn login_flow() -> Flow {
        serde_json::from_value(json!({
            "id": "7f0c",
            "type": "browser",
            "expires_at": "2026-10-19T12:00:00Z",
            "state": "choose_method",
            "ui": {
                "action": "https://id.example/self-service/login?flow=7f0c",
                "method": "POST",
                "nodes": [
                    {
                        "type": "input",
                        "group": "default",
                        "attributes": {"name": "csrf_token", "type": "hidden", "value": "tok", "required": true, "node_type": "input"},
                        "messages": [],
                        "meta": {}
                    },
                    {
                        "type": "input",
                        "group": "password",
                        "attributes": {"name": "identifier", "type": "text", "value": "", "node_type": "input"},
                        "messages": [{"id": 4000002, "text": "Property identifier is missing.", "type": "error"}],
                        "meta": {"label": {"id": 1070004, "text": "ID", "type": "info"}}
                    },
                    {
                        "type": "a",
                        "group": "code",
                        "attributes": {"href": "https://app.example/welcome", "id": "continue", "node_type": "a"},
                        "messages": [],
                        "meta": {}
                    }
                ],
                "messages": [{"id": 4000006, "text": "The provided credentials are invalid.", "type": "error"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn flow_accessors() {
        let flow = login_flow();
        assert_eq!(flow.csrf_token(), Some("tok"));
        assert_eq!(
            flow.first_message().map(|m| m.text.as_str()),
            Some("The provided credentials are invalid.")
        );
        assert!(flow.first_message().is_some_and(UiText::is_error));
        assert_eq!(flow.field_messages("identifier").count(), 1);
        assert_eq!(flow.field_messages("password").count(), 0);
        assert_eq!(flow.first_link(), Some("https://app.example/welcome"));
        assert!(flow.has_state("choose_method"));
    }

    #[test]
    fn continue_with_unknown_actions_are_ignored() {
        let actions: Vec<ContinueWith> = serde_json::from_value(json!([
            {"action": "set_ory_session_token", "ory_session_token": "x"},
            {"action": "show_verification_ui", "flow": {"id": "v-1", "verifiable_address": "a@b.c"}},
            {"action": "redirect_browser_to", "redirect_browser_to": "https://app.example/next"}
        ]))
        .unwrap();
        assert_eq!(actions[0], ContinueWith::Other);
        assert_eq!(verification_flow(&actions), Some("v-1"));
        assert_eq!(redirect_target(&actions), Some("https://app.example/next"));
    }

    #[test]
    fn verification_body_shapes() {
        let body = serde_json::to_value(UpdateVerificationFlowBody::code(
            "tok".into(),
            "123456".into(),
        ))
        .unwrap();
        assert_eq!(body, json!({"method": "code", "csrf_token": "tok", "code": "123456"}));

        let body = serde_json::to_value(UpdateVerificationFlowBody::email(
            "tok".into(),
            "a@b.c".into(),
        ))
        .unwrap();
        assert_eq!(body, json!({"method": "code", "csrf_token": "tok", "email": "a@b.c"}));
    }
}
