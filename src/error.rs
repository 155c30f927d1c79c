pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Attempts exhausted: {0}")]
    AttemptsExhausted(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("Invalid answer for question {question_id}: {reason}")]
    InvalidAnswer { question_id: String, reason: String },

    #[error("The attempt is closed")]
    AttemptClosed,

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn is_attempts_exhausted(&self) -> bool {
        matches!(self, Error::AttemptsExhausted(_))
    }

    /// Failures a later retry may get past. Everything caused by the
    /// transport or a misbehaving server lands here.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Backend { .. } | Error::Reqwest(_) | Error::Io(_) | Error::Internal(_)
        )
    }

    /// Message suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            Error::AttemptsExhausted(msg)
            | Error::NotFound(msg)
            | Error::Unauthorized(msg)
            | Error::BadRequest(msg) => msg.clone(),
            Error::Backend { message, .. } => message.clone(),
            Error::Reqwest(_) | Error::Io(_) => {
                "Unable to reach the server, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}
