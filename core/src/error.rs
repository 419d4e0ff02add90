use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned HTTP {status}")]
    FeedStatus { status: u16 },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unknown assumption parameter '{id}'")]
    UnknownParameter { id: String },

    #[error("{id} must be between {min} and {max} (got {value})")]
    ParameterOutOfRange {
        id: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{id} must move in steps of {step} (got {value})")]
    ParameterOffStep { id: String, value: f64, step: f64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
