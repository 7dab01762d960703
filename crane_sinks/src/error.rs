use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkFailure {
    #[error("database: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("publish to {topic} failed: {message}")]
    Publish { topic: String, message: String },
    #[error("sink already closed")]
    Closed,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SinkFailure>;
