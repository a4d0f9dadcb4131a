use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The caller asked for something the chat model forbids, e.g. a
    /// direct-message room with themselves. Never retried.
    #[error("{0}")]
    InvalidOperation(String),

    /// A storage failure, surfaced with the underlying message preserved.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ChatError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}
