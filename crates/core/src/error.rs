use thiserror::Error;

#[derive(Error, Debug)]
pub enum QdynnError {
    #[error("Invalid upstream: {0}")]
    InvalidUpstream(String),
}

pub type Result<T> = std::result::Result<T, QdynnError>;
