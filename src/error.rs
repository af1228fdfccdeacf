//! Error types for intpack

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Format corruption: {0}")]
    Corruption(String),

    #[error("End of stream: ord {ord} of {value_count}")]
    Eof { ord: u64, value_count: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
