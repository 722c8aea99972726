//! Crate-wide error type
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file could not be written
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A JSON document did not match the expected shape
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The Live-Link address did not resolve
    #[error("bad Live-Link address `{0}`")]
    BadAddress(String),

    /// Blender's Live-Link listener did not accept the connection
    #[error("could not connect to Blender at {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The connection dropped while sending a script
    #[error("failed to transfer the script: {0}")]
    Transfer(#[source] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
