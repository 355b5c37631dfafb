use crate::persistence::StoreError;
use crate::session::Session;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no unstarted backlog items for '{0}'")]
    EmptyBacklog(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(#[source] StoreError),
    /// The session status was written but the motivation step failed.
    #[error("session {} was marked {} but the motivation update failed: {source}", .session.id, .session.status)]
    PartialEffect {
        session: Box<Session>,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        EngineError::NotFound(message.into())
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => EngineError::NotFound(what),
            StoreError::AlreadyExists(what) => EngineError::Conflict(what),
            StoreError::InvalidData(message) => EngineError::InvalidInput(message),
            other => EngineError::Storage(other),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
