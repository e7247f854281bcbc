use thiserror::Error;

#[derive(Error, Debug)]
pub enum FomoError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl FomoError {
    /// True when the whole automation session is gone, as opposed to a
    /// failure scoped to a single page or selector.
    pub fn is_session(&self) -> bool {
        matches!(self, FomoError::Session(_))
    }
}

pub type Result<T> = std::result::Result<T, FomoError>;
