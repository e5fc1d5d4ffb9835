//! Maps validated CLI arguments to an action.

use crate::cli::{
    actions::{server::Args, Action},
    commands::{
        ARG_APP_NAME, ARG_PORT, ARG_PROFILE_URL, ARG_PUBLIC_URL, ARG_REQUEST_TIMEOUT, ARG_SDK_URL,
    },
};
use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or a URL is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let sdk_url = matches
        .get_one::<String>(ARG_SDK_URL)
        .cloned()
        .context("missing required argument: --sdk-url")?;
    Url::parse(&sdk_url).with_context(|| format!("invalid --{ARG_SDK_URL}: {sdk_url}"))?;

    let public_url = matches
        .get_one::<String>(ARG_PUBLIC_URL)
        .map_or("http://localhost:8080", String::as_str);
    let public_url =
        Url::parse(public_url).with_context(|| format!("invalid --{ARG_PUBLIC_URL}: {public_url}"))?;

    let profile_url = matches
        .get_one::<String>(ARG_PROFILE_URL)
        .filter(|url| !url.trim().is_empty())
        .map(|url| Url::parse(url).with_context(|| format!("invalid --{ARG_PROFILE_URL}: {url}")))
        .transpose()?;

    let app_name = matches
        .get_one::<String>(ARG_APP_NAME)
        .cloned()
        .unwrap_or_else(|| crate::portal::config::DEFAULT_APP_NAME.to_string());

    let request_timeout = Duration::from_secs(
        matches
            .get_one::<u64>(ARG_REQUEST_TIMEOUT)
            .copied()
            .unwrap_or(crate::portal::config::DEFAULT_REQUEST_TIMEOUT_SECONDS),
    );

    Ok(Action::Server(Args {
        port,
        sdk_url,
        public_url,
        profile_url,
        app_name,
        request_timeout,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn matches(args: &[&str]) -> clap::ArgMatches {
        let mut argv = vec!["portal"];
        argv.extend_from_slice(args);
        commands::new().get_matches_from(argv)
    }

    fn without_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(
            [
                ("PORTAL_PORT", None::<&str>),
                ("PORTAL_SDK_URL", None),
                ("PORTAL_PUBLIC_URL", None),
                ("PORTAL_PROFILE_URL", None),
                ("PORTAL_APP_NAME", None),
                ("PORTAL_REQUEST_TIMEOUT", None),
            ],
            f,
        );
    }

    #[test]
    fn builds_server_action() {
        without_env(|| {
            let action = handler(&matches(&[
                "--sdk-url",
                "http://kratos:4433",
                "--public-url",
                "https://portal.example",
                "--profile-url",
                "http://users/users",
                "-p",
                "9000",
            ]))
            .unwrap();

            let Action::Server(args) = action;
            assert_eq!(args.port, 9000);
            assert_eq!(args.sdk_url, "http://kratos:4433");
            assert_eq!(args.public_url.as_str(), "https://portal.example/");
            assert_eq!(
                args.profile_url.as_ref().map(Url::as_str),
                Some("http://users/users")
            );
            assert_eq!(args.app_name, "Portal");
            assert_eq!(args.request_timeout, Duration::from_secs(10));
        });
    }

    #[test]
    fn rejects_invalid_urls() {
        without_env(|| {
            let err = handler(&matches(&["--sdk-url", "kratos"])).unwrap_err();
            assert!(err.to_string().contains("--sdk-url"));

            let err = handler(&matches(&[
                "--sdk-url",
                "http://kratos:4433",
                "--public-url",
                "not a url",
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("--public-url"));
        });
    }

    #[test]
    fn empty_profile_url_disables_profiles() {
        without_env(|| {
            let Action::Server(args) =
                handler(&matches(&["--sdk-url", "http://kratos:4433", "--profile-url", ""]))
                    .unwrap();
            assert!(args.profile_url.is_none());
        });
    }
}
