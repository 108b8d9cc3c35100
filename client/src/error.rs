use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Invalid credentials or an expired session. Carries the backend's message verbatim.
    #[error("{0}")]
    Authentication(String),

    #[error("No active session")]
    MissingSession,

    #[error("Session expired")]
    SessionExpired,

    #[error("Request failed ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sign-out failed: {0}")]
    SignOut(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Session storage is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    /// Message suitable for a toast or inline form error.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Authentication(msg) => msg.clone(),
            StoreError::Api { message, .. } => message.clone(),
            StoreError::Validation(e) => e
                .field_errors()
                .into_iter()
                .map(|(field, errors)| {
                    let msgs: Vec<&str> = errors
                        .iter()
                        .filter_map(|err| err.message.as_ref().map(|m| m.as_ref()))
                        .collect();
                    if msgs.is_empty() {
                        let codes: Vec<&str> = errors.iter().map(|err| err.code.as_ref()).collect();
                        format!("{}: {}", field, codes.join(", "))
                    } else {
                        format!("{}: {}", field, msgs.join(", "))
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }

    /// Whether the session behind the request is no longer valid.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            StoreError::Authentication(_)
            | StoreError::MissingSession
            | StoreError::SessionExpired => true,
            StoreError::Api { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
