pub type Result<T> = std::result::Result<T, Error>;

/// Logical error kinds returned by the core services. The boundary layer
/// (HTTP or otherwise) owns the mapping to transport status codes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Paper already submitted: {0}")]
    AlreadyFinalized(String),

    #[error("Paper already graded: {0}")]
    AlreadyGraded(String),

    #[error("Invalid answer length: {0}")]
    InvalidAnswerLength(String),

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Insufficient questions: {0}")]
    InsufficientQuestions(String),

    #[error("Insufficient options: {0}")]
    InsufficientOptions(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid or expired token")]
    InvalidOrExpired,

    #[error("Corrupt state: {0}")]
    CorruptState(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
