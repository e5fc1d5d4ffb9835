use std::time::Duration;
use url::Url;

pub const DEFAULT_APP_NAME: &str = "Portal";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Runtime configuration of the portal, built from the CLI.
#[derive(Clone, Debug)]
pub struct PortalConfig {
    app_name: String,
    sdk_url: String,
    public_url: Url,
    profile_url: Option<Url>,
    request_timeout: Duration,
}

impl PortalConfig {
    /// `sdk_url` is the provider's public API, `public_url` where browsers reach the portal.
    #[must_use]
    pub fn new(sdk_url: impl Into<String>, public_url: Url) -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            sdk_url: sdk_url.into(),
            public_url,
            profile_url: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    #[must_use]
    pub fn with_profile_url(mut self, profile_url: Option<Url>) -> Self {
        self.profile_url = profile_url;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn sdk_url(&self) -> &str {
        &self.sdk_url
    }

    #[must_use]
    pub const fn public_url(&self) -> &Url {
        &self.public_url
    }

    #[must_use]
    pub const fn profile_url(&self) -> Option<&Url> {
        self.profile_url.as_ref()
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
