use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Language detection error: {0}")]
    Detection(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("History error: {0}")]
    History(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ParleyError>;
