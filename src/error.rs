use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Schema error: {requirement} (columns present: {})", columns.join(", "))]
    Schema {
        requirement: String,
        columns: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CleanError>;
