//! Browser-facing paths of the portal pages.

/// Login page, also the landing page.
pub const LOGIN: &str = "/";
/// Where unauthenticated or finished users are sent.
pub const HOME: &str = "/";
pub const REGISTRATION: &str = "/registration";
pub const VERIFICATION: &str = "/verification";
pub const DASHBOARD: &str = "/dashboard";
pub const LOGOUT: &str = "/logout";
/// Generic error page, takes `error=<json>` and `id=` query parameters.
pub const ERROR: &str = "/error";
pub const SESSION: &str = "/session";
pub const HEALTH: &str = "/health";

/// Home with the second factor requested.
pub const HOME_AAL2: &str = "/?aal2=true";

/// Path of a page bound to a given flow id.
#[must_use]
pub fn with_flow(path: &str, flow_id: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("flow", flow_id)
        .finish();
    format!("{path}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_flow_appends_query() {
        assert_eq!(with_flow(LOGIN, "abc"), "/?flow=abc");
        assert_eq!(
            with_flow(VERIFICATION, "a b"),
            "/verification?flow=a+b"
        );
    }
}
