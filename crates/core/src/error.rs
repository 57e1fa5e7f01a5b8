#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("document not found: {id}")]
    NotFound { id: String },
    #[error("revision conflict on document: {id}")]
    Conflict { id: String },
    #[error("cannot build a query from empty criteria")]
    EmptyCriteria,
    #[error("failed to serialise patient: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialise patient: {0}")]
    Deserialization(serde_json::Error),
    #[error("malformed store response: {0}")]
    MalformedResponse(String),
    #[error("store transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
