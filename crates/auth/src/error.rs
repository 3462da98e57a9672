use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("unsupported provider")]
    UnsupportedProvider(String),

    #[error("Could not listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Callback accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("authentication timed out")]
    Timeout,

    #[error("callback received without a code")]
    MalformedCallback,

    #[error("network error")]
    Transport(#[from] TransportError),

    #[error("token exchange timed out")]
    ExchangeTimeout,

    #[error("token not found in response")]
    TokenNotFound,

    #[error("Already authenticated.")]
    AlreadyAuthenticated,

    #[error("Login already in progress.")]
    FlowActive,
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Configuration(msg) => msg.clone(),
            AuthError::UnsupportedProvider(name) => {
                format!("Unsupported OAuth provider '{name}'. Use github or google.")
            }
            AuthError::Bind { port, .. } => {
                format!("Could not listen on port {port} for the login callback.")
            }
            AuthError::Accept(_) | AuthError::Timeout | AuthError::MalformedCallback => {
                "Authentication timed out or failed to receive callback.".to_string()
            }
            AuthError::Transport(_)
            | AuthError::ExchangeTimeout
            | AuthError::TokenNotFound => format!("Token exchange failed: {self}"),
            AuthError::AlreadyAuthenticated | AuthError::FlowActive => self.to_string(),
        }
    }

    /// Whether the user can reasonably press login again without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::Timeout
                | AuthError::MalformedCallback
                | AuthError::Accept(_)
                | AuthError::Transport(_)
                | AuthError::ExchangeTimeout
        )
    }
}

/// Failure of the injected request capability before any response arrived.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError(e.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
