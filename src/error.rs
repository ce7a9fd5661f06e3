use thiserror::Error;

/// Shown to the user for every refresh failure, whatever the cause.
pub(crate) const LOGIN_ERROR_MESSAGE: &str = "Cannot log-in to GitLab Server with provided token";
pub(crate) const LOGIN_ERROR_TITLE: &str = "Cannot Login To GitLab";

#[derive(Error, Debug)]
pub(crate) enum RefreshError {
    #[error("GitLab rejected the token (HTTP {status})")]
    Auth { status: u16 },

    #[error("request to GitLab failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitLab API returned HTTP {status}")]
    Api { status: u16 },

    #[error("unexpected GitLab response: {0}")]
    Decode(String),

    #[error("refresh worker stopped before reporting a result")]
    Interrupted,
}

impl RefreshError {
    pub(crate) fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => RefreshError::Auth { status },
            _ => RefreshError::Api { status },
        }
    }

    /// Every variant collapses into the same login notice.
    pub(crate) fn user_message(&self) -> &'static str {
        LOGIN_ERROR_MESSAGE
    }
}
