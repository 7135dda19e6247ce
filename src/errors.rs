use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Client is closed")]
    ClientClosed,

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Index error: {0}")]
    IndexError(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
