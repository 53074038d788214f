use stash::{CacheError, MutationError, RemoteError, StorageError};

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// A short message suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            Error::Mutation(MutationError::Write(RemoteError::Rejected { message, .. }))
            | Error::Remote(RemoteError::Rejected { message, .. }) => message.clone(),
            Error::Mutation(MutationError::Write(RemoteError::Transport(_)))
            | Error::Remote(RemoteError::Transport(_)) => {
                "Could not reach the server. Please try again.".to_string()
            }
            Error::Storage(_) => "Could not save on this device.".to_string(),
            _ => "Something went wrong.".to_string(),
        }
    }
}
