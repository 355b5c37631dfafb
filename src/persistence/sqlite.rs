use super::{
    BacklogStore, FixedEventStore, MotivationStore, ScheduleStore, StoreError, StoreResult,
};
use crate::backlog::{BacklogItem, BacklogStatus};
use crate::fixed_event::FixedInterval;
use crate::motivation::MotivationRecord;
use crate::session::{Session, SessionStatus};
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::de::DeserializeOwned;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9f";

fn timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// SQLite-backed store. Rows keep their indexed columns next to a JSON copy of
/// the full record; replace and read-modify-write run in one transaction.
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS backlog_items (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                owner TEXT NOT NULL,
                status TEXT NOT NULL,
                item_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_backlog_owner ON backlog_items (owner, status);
            CREATE TABLE IF NOT EXISTS fixed_events (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                event_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_fixed_events_owner ON fixed_events (owner, start_time);
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                status TEXT NOT NULL,
                session_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_owner ON sessions (owner, start_time);
            CREATE TABLE IF NOT EXISTS motivation (
                owner TEXT PRIMARY KEY,
                record_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn query_json<T, P>(&self, sql: &str, params: P) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned,
        P: rusqlite::Params,
    {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut records = Vec::new();
        for json in rows {
            let json = json?;
            records.push(serde_json::from_str(&json)?);
        }
        Ok(records)
    }

    fn load_motivation(tx: &Transaction, owner: &str) -> StoreResult<Option<MotivationRecord>> {
        let json: Option<String> = tx
            .query_row(
                "SELECT record_json FROM motivation WHERE owner = ?1",
                params![owner],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }

    fn save_motivation(tx: &Transaction, record: &MotivationRecord) -> StoreResult<()> {
        let json = serde_json::to_string(record)?;
        tx.execute(
            "INSERT INTO motivation (owner, record_json) VALUES (?1, ?2)
             ON CONFLICT(owner) DO UPDATE SET record_json = excluded.record_json",
            params![record.owner, json],
        )?;
        Ok(())
    }
}

impl BacklogStore for SqliteStore {
    fn list_unstarted(&self, owner: &str) -> StoreResult<Vec<BacklogItem>> {
        self.query_json(
            "SELECT item_json FROM backlog_items WHERE owner = ?1 AND status = ?2 ORDER BY seq ASC",
            params![owner, BacklogStatus::Unstarted.as_str()],
        )
    }

    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<BacklogItem>> {
        self.query_json(
            "SELECT item_json FROM backlog_items WHERE owner = ?1 ORDER BY seq ASC",
            params![owner],
        )
    }

    fn create(&self, item: BacklogItem) -> StoreResult<()> {
        let json = serde_json::to_string(&item)?;
        let conn = self.connection.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO backlog_items (id, owner, status, item_json) VALUES (?1, ?2, ?3, ?4)",
            params![item.id, item.owner, item.status.as_str(), json],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyExists(format!("backlog item {}", item.id)));
        }
        Ok(())
    }
}

impl FixedEventStore for SqliteStore {
    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<FixedInterval>> {
        self.query_json(
            "SELECT event_json FROM fixed_events WHERE owner = ?1 ORDER BY start_time ASC",
            params![owner],
        )
    }

    fn list_by_owner_in_range(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<FixedInterval>> {
        self.query_json(
            "SELECT event_json FROM fixed_events
             WHERE owner = ?1 AND start_time < ?3 AND end_time > ?2
             ORDER BY start_time ASC",
            params![owner, timestamp(start), timestamp(end)],
        )
    }

    fn create(&self, interval: FixedInterval) -> StoreResult<()> {
        interval.validate().map_err(StoreError::InvalidData)?;
        let json = serde_json::to_string(&interval)?;
        let conn = self.connection.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO fixed_events (id, owner, start_time, end_time, event_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                interval.id,
                interval.owner,
                timestamp(interval.start),
                timestamp(interval.end),
                json
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyExists(format!("fixed event {}", interval.id)));
        }
        Ok(())
    }
}

impl ScheduleStore for SqliteStore {
    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<Session>> {
        self.query_json(
            "SELECT session_json FROM sessions WHERE owner = ?1 ORDER BY start_time ASC, id ASC",
            params![owner],
        )
    }

    fn list_by_owner_in_range(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Session>> {
        self.query_json(
            "SELECT session_json FROM sessions
             WHERE owner = ?1 AND start_time < ?3 AND end_time > ?2
             ORDER BY start_time ASC, id ASC",
            params![owner, timestamp(start), timestamp(end)],
        )
    }

    fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self
            .query_json("SELECT session_json FROM sessions WHERE id = ?1", params![id])?
            .into_iter()
            .next())
    }

    fn replace_all_for_owner(&self, owner: &str, sessions: Vec<Session>) -> StoreResult<()> {
        super::validate_batch(owner, &sessions)?;
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sessions WHERE owner = ?1", params![owner])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sessions (id, owner, start_time, end_time, status, session_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for session in &sessions {
                let json = serde_json::to_string(session)?;
                stmt.execute(params![
                    session.id,
                    session.owner,
                    timestamp(session.start),
                    timestamp(session.end),
                    session.status.as_str(),
                    json
                ])
                .map_err(|err| match err {
                    rusqlite::Error::SqliteFailure(code, _)
                        if code.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        StoreError::AlreadyExists(format!("session {}", session.id))
                    }
                    other => StoreError::Sqlite(other),
                })?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn update_status(&self, id: &str, status: SessionStatus) -> StoreResult<Session> {
        if !status.is_terminal() {
            return Err(StoreError::InvalidData(format!(
                "session {id} can only move to a terminal status, not {status}"
            )));
        }
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        let json: Option<String> = tx
            .query_row(
                "SELECT session_json FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(json) = json else {
            return Err(StoreError::NotFound(format!("session {id}")));
        };
        let mut session: Session = serde_json::from_str(&json)?;
        if session.status.is_terminal() {
            return Err(StoreError::NotFound(format!(
                "scheduled session {id} (already {})",
                session.status
            )));
        }
        session.status = status;
        tx.execute(
            "UPDATE sessions SET status = ?2, session_json = ?3 WHERE id = ?1",
            params![id, status.as_str(), serde_json::to_string(&session)?],
        )?;
        tx.commit()?;
        Ok(session)
    }
}

impl MotivationStore for SqliteStore {
    fn get(&self, owner: &str) -> StoreResult<Option<MotivationRecord>> {
        Ok(self
            .query_json(
                "SELECT record_json FROM motivation WHERE owner = ?1",
                params![owner],
            )?
            .into_iter()
            .next())
    }

    fn upsert(&self, record: MotivationRecord) -> StoreResult<()> {
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        Self::save_motivation(&tx, &record)?;
        tx.commit()?;
        Ok(())
    }

    fn modify(
        &self,
        owner: &str,
        apply: &dyn Fn(MotivationRecord) -> MotivationRecord,
    ) -> StoreResult<MotivationRecord> {
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        let current =
            Self::load_motivation(&tx, owner)?.unwrap_or_else(|| MotivationRecord::new(owner));
        let updated = apply(current);
        Self::save_motivation(&tx, &updated)?;
        tx.commit()?;
        Ok(updated)
    }
}
