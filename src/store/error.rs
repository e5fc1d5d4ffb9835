use crate::sdk::SdkError;
use tokio::sync::watch;
use tracing::debug;

/// Last error surfaced to the user, shown once as a toast.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorState {
    pub message: Option<String>,
    /// HTTP status the message came with.
    pub kind: Option<u16>,
}

#[derive(Debug)]
pub struct ErrorStore {
    state: watch::Sender<ErrorState>,
}

impl Default for ErrorStore {
    fn default() -> Self {
        Self::with_state(ErrorState::default())
    }
}

impl ErrorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_state(state: ErrorState) -> Self {
        let (state, _) = watch::channel(state);
        Self { state }
    }

    pub fn set_error(&self, message: impl Into<String>, kind: u16) {
        let message = message.into();
        debug!("error store: {kind} {message}");
        self.state.send_replace(ErrorState {
            message: Some(message),
            kind: Some(kind),
        });
    }

    pub fn clear_error(&self) {
        self.state.send_replace(ErrorState::default());
    }

    /// Stores the first UI message of a provider answer.
    ///
    /// Returns `false` when the error has no status or no message to show.
    pub fn report(&self, err: &SdkError) -> bool {
        match (err.status(), err.first_ui_message()) {
            (Some(status), Some(message)) => {
                self.set_error(message, status.as_u16());
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ErrorState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ErrorState> {
        self.state.subscribe()
    }

    /// Reads the pending message and clears it, so it is shown only once.
    pub fn take(&self) -> Option<(String, u16)> {
        let previous = self.state.send_replace(ErrorState::default());
        match previous {
            ErrorState {
                message: Some(message),
                kind: Some(kind),
            } => Some((message, kind)),
            _ => None,
        }
    }
}
