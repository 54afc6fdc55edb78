//! Error types for the bridge core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Could not determine {0} directory")]
    Directory(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
