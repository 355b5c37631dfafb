//! Storage collaborators for the scheduling engine.
//!
//! Each concern has its own trait so a deployment can mix backends; both
//! bundled stores implement all four. Every method is atomic on its own:
//! implementations take their lock (or transaction) once per call.

use crate::backlog::BacklogItem;
use crate::fixed_event::FixedInterval;
use crate::motivation::MotivationRecord;
use crate::session::{Session, SessionStatus};
use crate::validation;
use chrono::NaiveDateTime;
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait BacklogStore: Send + Sync {
    /// Unstarted items for `owner`, in insertion order.
    fn list_unstarted(&self, owner: &str) -> StoreResult<Vec<BacklogItem>>;
    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<BacklogItem>>;
    fn create(&self, item: BacklogItem) -> StoreResult<()>;
}

pub trait FixedEventStore: Send + Sync {
    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<FixedInterval>>;
    /// Intervals overlapping `[start, end)`.
    fn list_by_owner_in_range(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<FixedInterval>>;
    fn create(&self, interval: FixedInterval) -> StoreResult<()>;
}

pub trait ScheduleStore: Send + Sync {
    /// Sessions for `owner`, ordered by start.
    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<Session>>;
    /// Sessions overlapping `[start, end)`, ordered by start.
    fn list_by_owner_in_range(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Session>>;
    fn get(&self, id: &str) -> StoreResult<Option<Session>>;
    /// Swaps every session of `owner` for `sessions` in one step.
    fn replace_all_for_owner(&self, owner: &str, sessions: Vec<Session>) -> StoreResult<()>;
    /// Moves a `Scheduled` session to the terminal `status`. A non-terminal
    /// target is `InvalidData`; sessions already in a terminal state are
    /// reported as `NotFound`.
    fn update_status(&self, id: &str, status: SessionStatus) -> StoreResult<Session>;
}

pub trait MotivationStore: Send + Sync {
    fn get(&self, owner: &str) -> StoreResult<Option<MotivationRecord>>;
    fn upsert(&self, record: MotivationRecord) -> StoreResult<()>;
    /// Read-modify-write under a single lock or transaction.
    fn modify(
        &self,
        owner: &str,
        apply: &dyn Fn(MotivationRecord) -> MotivationRecord,
    ) -> StoreResult<MotivationRecord>;
}

/// Checks a batch before it replaces an owner's schedule.
pub fn validate_batch(owner: &str, sessions: &[Session]) -> StoreResult<()> {
    if let Some(session) = sessions.iter().find(|session| session.owner != owner) {
        return Err(StoreError::InvalidData(format!(
            "session {} belongs to '{}', not '{owner}'",
            session.id, session.owner
        )));
    }
    validation::validate_sessions(sessions).map_err(|err| StoreError::InvalidData(err.to_string()))
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{load_sessions_from_json, save_sessions_to_csv, save_sessions_to_json};
pub use memory::InMemoryStore;
