pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_SDK_URL: &str = "sdk-url";
pub const ARG_PUBLIC_URL: &str = "public-url";
pub const ARG_PROFILE_URL: &str = "profile-url";
pub const ARG_APP_NAME: &str = "app-name";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("portal")
        .about("Authentication front end")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PORTAL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SDK_URL)
                .long("sdk-url")
                .help("Public API of the identity provider, example: http://127.0.0.1:4433")
                .env("PORTAL_SDK_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PUBLIC_URL)
                .long("public-url")
                .help("URL browsers use to reach the portal")
                .default_value("http://localhost:8080")
                .env("PORTAL_PUBLIC_URL"),
        )
        .arg(
            Arg::new(ARG_PROFILE_URL)
                .long("profile-url")
                .help("Users service collection, example: http://localhost:8081/users")
                .env("PORTAL_PROFILE_URL"),
        )
        .arg(
            Arg::new(ARG_APP_NAME)
                .long("app-name")
                .help("Name shown on the pages")
                .default_value(crate::portal::config::DEFAULT_APP_NAME)
                .env("PORTAL_APP_NAME"),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long("request-timeout")
                .help("Timeout in seconds for calls to the identity provider and users service")
                .default_value("10")
                .env("PORTAL_REQUEST_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..)),
        );

    logging::with_args(command)
}
