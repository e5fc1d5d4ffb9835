//! # Portal (authentication front end)
//!
//! `portal` renders the self-service pages of an Ory Kratos style identity
//! provider (login, registration, verification, logout) on the server and talks
//! to the provider's public API on behalf of the browser.
//!
//! ## Flows
//!
//! Every page is backed by a provider *flow*: a short lived transaction carrying
//! the form fields, messages and CSRF token. Pages create a flow, redirect to
//! `?flow=<id>`, render it, and submit the form back to the provider. Cookies
//! travel in both directions so the provider keeps owning the CSRF and session
//! cookies.
//!
//! ## Recovery
//!
//! Provider errors are classified by status code and a handful of payload
//! fields (`id`, `redirect_browser_to`, `use_flow_id`) in [`recovery`]. The
//! outcome is a redirect, a full browser navigation, a replacement flow, or the
//! error itself when nothing can be recovered.
//!
//! ## State
//!
//! [`store`] holds the two observable containers the pages read from: the
//! session/profile store and the error (toast) store.

pub mod cli;
pub mod paths;
pub mod portal;
pub mod profile;
pub mod recovery;
pub mod sdk;
pub mod session;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
