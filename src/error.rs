use std::io;

use thiserror::Error;

use crate::api::ApiError;
use crate::directory::DirectoryError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    NotFound(String),
}

impl CommandError {
    /// A 401 anywhere below ends the command quietly rather than as a failure.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            CommandError::Api(error) => error.is_unauthorized(),
            CommandError::Directory(DirectoryError::Api(error)) => error.is_unauthorized(),
            _ => false,
        }
    }
}
