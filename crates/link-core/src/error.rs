use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid link token: {0}")]
    InvalidToken(String),

    #[error("element #{0} not found")]
    MissingElement(String),

    #[error("invalid {tag} payload: {reason}")]
    InvalidPayload { tag: String, reason: String },

    #[error("host error: {0}")]
    Host(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
