use std::error::Error;

use thiserror::Error;

/// Result alias for collaborator lookups.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a backing store consulted by the engine (preferences, song catalog).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or failed to answer.
    #[error("{store} storage unavailable: {message}")]
    Unavailable {
        /// Which store failed.
        store: &'static str,
        /// What the engine was doing.
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap a backend failure of `store`.
    pub fn unavailable(
        store: &'static str,
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            store,
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Store that raised the error.
    pub fn store(&self) -> &'static str {
        match self {
            StorageError::Unavailable { store, .. } => store,
        }
    }
}
