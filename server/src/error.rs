//! Error types for the word game server

use crate::client_manager::ConnectionId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for server setup and run operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that stop the server from starting or running
#[derive(Error, Debug)]
pub enum ServerError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The word list could not be loaded
    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    /// Invalid configuration values
    #[error("Configuration error: {message}")]
    Config { message: String },
}

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin} contains no usable words")]
    Empty { origin: String },
}

/// Rejections from the client registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("name {0:?} is already taken")]
    DuplicateName(String),

    #[error("name must be a non-empty single line")]
    InvalidName,

    #[error("connection {0} is not waiting for a name")]
    UnknownConnection(ConnectionId),
}

/// Guesses rejected without touching the round
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessError {
    #[error("guess submitted out of turn")]
    NotYourTurn,

    #[error("guess is not a single new letter")]
    InvalidGuess,
}
