use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Catalog has no valid candidates: {0}")]
    EmptyCatalog(String),

    #[error("Invalid threshold {0}: must be within 0.0..=1.0")]
    InvalidThreshold(f32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
