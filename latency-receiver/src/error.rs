use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid host address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Bad sequence type: expected ulong, got {0}")]
    BadSequenceType(&'static str),

    #[error("Link is not open")]
    LinkNotOpen,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
