use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrideError {
    #[error("not initialized: run 'stride init'")]
    NotInitialized,

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("{entity} not found: {id}")]
    EntityNotFound { entity: &'static str, id: String },

    #[error("oracle error: {0}")]
    Oracle(#[from] stride_oracle::OracleError),

    #[error("store error: {0}")]
    Store(String),

    #[error("background task failed: {0}")]
    Join(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StrideError>;
