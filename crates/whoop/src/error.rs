use thiserror::Error;

pub type Result<T> = std::result::Result<T, WhoopError>;

#[derive(Debug, Error)]
pub enum WhoopError {
    /// No usable credentials. Never retried by the client.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limit exceeded, try again later")]
    RateLimited {
        /// Seconds from the `Retry-After` header, when upstream sent one.
        retry_after: Option<u64>,
    },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("token store error: {0:#}")]
    Store(anyhow::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WhoopError {
    /// Timeouts, connection failures and 5xx responses; a later attempt may
    /// succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WhoopError::Transport(e) => e.is_timeout() || e.is_connect(),
            WhoopError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, WhoopError::Auth(_))
    }
}

impl From<serde_json::Error> for WhoopError {
    fn from(e: serde_json::Error) -> Self {
        WhoopError::Decode(e.to_string())
    }
}
