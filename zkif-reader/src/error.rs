//! Reader error types

use thiserror::Error;
use zkif_spec::ZkifError;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Message error: {0}")]
    Spec(#[from] ZkifError),

    #[error("No circuit message found")]
    MissingCircuit,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
