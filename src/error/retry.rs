use thiserror::Error as ThisError;

/// Terminal result of a [`crate::retry::RetryEngine`] run that did not succeed.
#[derive(Debug, ThisError)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The operation reported a failure that must not be retried.
    #[error("non retryable error running {name:?}: {source}")]
    Fatal {
        name: String,
        #[source]
        source: E,
    },

    #[error("giving up retrying {name:?}, max attempts {max_attempts} reached")]
    Exhausted { name: String, max_attempts: u32 },

    #[error("retrying {name:?} cancelled")]
    Cancelled { name: String },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Returns the underlying cause of a fatal failure.
    pub fn into_fatal(self) -> Option<E> {
        match self {
            RetryError::Fatal { source, .. } => Some(source),
            _ => None,
        }
    }
}
