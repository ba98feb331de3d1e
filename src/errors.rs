//!
//! src/errors.rs
//!
//! Defines enums and methods of error conversion
//! for errors the transfer pipeline uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("config error: {0}")]
    Config(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("no tracks: {0}")]
    NoTracks(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self { TransferError::Http(e.to_string()) }
}

impl From<serde_json::Error> for TransferError {
    fn from(e: serde_json::Error) -> Self { TransferError::Parse(e.to_string()) }
}
