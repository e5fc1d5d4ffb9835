use crate::{
    cli::telemetry,
    portal::{self, PortalConfig},
};
use anyhow::Result;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub sdk_url: String,
    pub public_url: Url,
    pub profile_url: Option<Url>,
    pub app_name: String,
    pub request_timeout: Duration,
}

impl Args {
    #[must_use]
    pub fn config(&self) -> PortalConfig {
        PortalConfig::new(self.sdk_url.clone(), self.public_url.clone())
            .with_app_name(self.app_name.clone())
            .with_profile_url(self.profile_url.clone())
            .with_request_timeout(self.request_timeout)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the HTTP clients cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        "port: {}, sdk url: {}, public url: {}, profile url: {:?}, timeout: {:?}",
        args.port, args.sdk_url, args.public_url, args.profile_url, args.request_timeout
    );

    let result = portal::new(args.port, args.config()).await;

    telemetry::shutdown_tracer();

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_every_setting() {
        let args = Args {
            port: 8080,
            sdk_url: "http://kratos:4433".to_string(),
            public_url: Url::parse("https://portal.example").unwrap(),
            profile_url: Some(Url::parse("http://users/users").unwrap()),
            app_name: "Acme".to_string(),
            request_timeout: Duration::from_secs(4),
        };
        let config = args.config();
        assert_eq!(config.sdk_url(), "http://kratos:4433");
        assert_eq!(config.public_url().as_str(), "https://portal.example/");
        assert_eq!(config.profile_url().map(Url::as_str), Some("http://users/users"));
        assert_eq!(config.app_name(), "Acme");
        assert_eq!(config.request_timeout(), Duration::from_secs(4));
    }
}
