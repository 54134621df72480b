use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage configuration: {0}")]
    Config(String),

    #[error("blob '{0}' already exists")]
    AlreadyExists(String),

    #[error("storage: {0}")]
    Storage(String),
}
