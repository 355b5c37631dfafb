use super::StoreResult;
use crate::session::Session;
use crate::validation;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct ScheduleSnapshot {
    owner: String,
    sessions: Vec<Session>,
}

pub fn save_sessions_to_json<P: AsRef<Path>>(
    owner: &str,
    sessions: &[Session],
    path: P,
) -> StoreResult<()> {
    super::validate_batch(owner, sessions)?;
    let snapshot = ScheduleSnapshot {
        owner: owner.to_string(),
        sessions: sessions.to_vec(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

/// Returns the owner and sessions stored by [`save_sessions_to_json`].
pub fn load_sessions_from_json<P: AsRef<Path>>(path: P) -> StoreResult<(String, Vec<Session>)> {
    let file = File::open(path)?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(file)?;
    validation::validate_sessions(&snapshot.sessions)
        .map_err(|err| super::StoreError::InvalidData(err.to_string()))?;
    Ok((snapshot.owner, snapshot.sessions))
}

#[derive(Serialize)]
struct SessionCsvRecord<'a> {
    id: &'a str,
    owner: &'a str,
    item_id: &'a str,
    item_title: &'a str,
    date: String,
    start_time: String,
    end_time: String,
    status: &'a str,
}

impl<'a> From<&'a Session> for SessionCsvRecord<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            id: &session.id,
            owner: &session.owner,
            item_id: &session.item_id,
            item_title: session.item_title.as_deref().unwrap_or(""),
            date: session.start.format("%Y-%m-%d").to_string(),
            start_time: session.start.format("%H:%M").to_string(),
            end_time: session.end.format("%H:%M").to_string(),
            status: session.status.as_str(),
        }
    }
}

/// Calendar-style export, one row per session.
pub fn save_sessions_to_csv<P: AsRef<Path>>(sessions: &[Session], path: P) -> StoreResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for session in sessions {
        writer.serialize(SessionCsvRecord::from(session))?;
    }
    writer.flush()?;
    Ok(())
}
