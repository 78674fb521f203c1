use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Disallow-list error: {0}")]
    Disallow(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
