use crate::{
    sdk::{SdkError, Session},
    session::{ProfileData, UserSession},
};
use std::future::Future;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    /// A refetch is in flight.
    pub is_loading: bool,
    /// A session lookup has succeeded at least once, or one was supplied.
    pub initialized: bool,
    /// `None` when unauthenticated. A failed lookup keeps the previous value.
    pub session: Option<Session>,
    pub profile: Option<ProfileData>,
    /// Message of the last failed lookup.
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<SessionState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionStore {
    /// Creates a store, optionally seeded with a session resolved elsewhere.
    #[must_use]
    pub fn new(session: Option<Session>) -> Self {
        let initialized = session.is_some();
        let (state, _) = watch::channel(SessionState {
            is_loading: false,
            initialized,
            session,
            profile: None,
            error: None,
        });
        Self { state }
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.state.send_modify(|state| state.session = session);
    }

    pub fn set_profile(&self, profile: Option<ProfileData>) {
        self.state.send_modify(|state| state.profile = profile);
    }

    /// Looks the session up again with `fetch`.
    ///
    /// A 401 answer means "no session" and is not recorded as an error.
    pub async fn refetch<F, Fut>(&self, fetch: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Session, SdkError>>,
    {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let result = fetch().await;

        self.state.send_modify(|state| {
            state.is_loading = false;
            match result {
                Ok(session) => {
                    debug!("session {} refreshed", session.id);
                    state.initialized = true;
                    state.session = Some(session);
                }
                Err(err) if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED) => {
                    state.session = None;
                }
                Err(err) => {
                    warn!("failed to refresh session: {err}");
                    state.error = Some(err.to_string());
                }
            }
        });
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn user_session(&self) -> UserSession {
        let state = self.state.borrow();
        UserSession {
            session: state.session.clone(),
            profile: state.profile.clone(),
        }
    }
}
