//! Observable state containers read by the pages.
//!
//! Both stores wrap a `tokio::sync::watch` channel: writers replace the state,
//! readers take snapshots or subscribe to changes.

pub mod error;
pub mod session;

pub use self::error::{ErrorState, ErrorStore};
pub use self::session::{SessionState, SessionStore};
