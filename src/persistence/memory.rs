use super::{
    BacklogStore, FixedEventStore, MotivationStore, ScheduleStore, StoreError, StoreResult,
};
use crate::backlog::BacklogItem;
use crate::calendar::overlaps;
use crate::fixed_event::FixedInterval;
use crate::motivation::MotivationRecord;
use crate::session::{Session, SessionStatus};
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Tables {
    backlog: Vec<BacklogItem>,
    fixed_events: Vec<FixedInterval>,
    sessions: HashMap<String, Session>,
    motivation: HashMap<String, MotivationRecord>,
}

/// Process-local store; one read/write lock guards every table.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_start(mut sessions: Vec<Session>) -> Vec<Session> {
    sessions.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    sessions
}

impl BacklogStore for InMemoryStore {
    fn list_unstarted(&self, owner: &str) -> StoreResult<Vec<BacklogItem>> {
        let tables = self.tables.read();
        Ok(tables
            .backlog
            .iter()
            .filter(|item| item.owner == owner && item.is_unstarted())
            .cloned()
            .collect())
    }

    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<BacklogItem>> {
        let tables = self.tables.read();
        Ok(tables
            .backlog
            .iter()
            .filter(|item| item.owner == owner)
            .cloned()
            .collect())
    }

    fn create(&self, item: BacklogItem) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.backlog.iter().any(|existing| existing.id == item.id) {
            return Err(StoreError::AlreadyExists(format!("backlog item {}", item.id)));
        }
        tables.backlog.push(item);
        Ok(())
    }
}

impl FixedEventStore for InMemoryStore {
    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<FixedInterval>> {
        let tables = self.tables.read();
        let mut events: Vec<FixedInterval> = tables
            .fixed_events
            .iter()
            .filter(|event| event.owner == owner)
            .cloned()
            .collect();
        events.sort_by_key(|event| event.start);
        Ok(events)
    }

    fn list_by_owner_in_range(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<FixedInterval>> {
        let tables = self.tables.read();
        let mut events: Vec<FixedInterval> = tables
            .fixed_events
            .iter()
            .filter(|event| event.owner == owner && overlaps(event.start, event.end, start, end))
            .cloned()
            .collect();
        events.sort_by_key(|event| event.start);
        Ok(events)
    }

    fn create(&self, interval: FixedInterval) -> StoreResult<()> {
        interval.validate().map_err(StoreError::InvalidData)?;
        let mut tables = self.tables.write();
        if tables.fixed_events.iter().any(|existing| existing.id == interval.id) {
            return Err(StoreError::AlreadyExists(format!("fixed event {}", interval.id)));
        }
        tables.fixed_events.push(interval);
        Ok(())
    }
}

impl ScheduleStore for InMemoryStore {
    fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<Session>> {
        let tables = self.tables.read();
        Ok(sorted_by_start(
            tables
                .sessions
                .values()
                .filter(|session| session.owner == owner)
                .cloned()
                .collect(),
        ))
    }

    fn list_by_owner_in_range(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Session>> {
        let tables = self.tables.read();
        Ok(sorted_by_start(
            tables
                .sessions
                .values()
                .filter(|session| {
                    session.owner == owner && overlaps(session.start, session.end, start, end)
                })
                .cloned()
                .collect(),
        ))
    }

    fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().sessions.get(id).cloned())
    }

    fn replace_all_for_owner(&self, owner: &str, sessions: Vec<Session>) -> StoreResult<()> {
        super::validate_batch(owner, &sessions)?;
        let mut tables = self.tables.write();
        if let Some(clash) = sessions.iter().find(|session| {
            tables
                .sessions
                .get(&session.id)
                .is_some_and(|existing| existing.owner != owner)
        }) {
            return Err(StoreError::AlreadyExists(format!("session {}", clash.id)));
        }
        tables.sessions.retain(|_, session| session.owner != owner);
        for session in sessions {
            tables.sessions.insert(session.id.clone(), session);
        }
        Ok(())
    }

    fn update_status(&self, id: &str, status: SessionStatus) -> StoreResult<Session> {
        if !status.is_terminal() {
            return Err(StoreError::InvalidData(format!(
                "session {id} can only move to a terminal status, not {status}"
            )));
        }
        let mut tables = self.tables.write();
        let session = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;
        if session.status.is_terminal() {
            return Err(StoreError::NotFound(format!(
                "scheduled session {id} (already {})",
                session.status
            )));
        }
        session.status = status;
        Ok(session.clone())
    }
}

impl MotivationStore for InMemoryStore {
    fn get(&self, owner: &str) -> StoreResult<Option<MotivationRecord>> {
        Ok(self.tables.read().motivation.get(owner).cloned())
    }

    fn upsert(&self, record: MotivationRecord) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.motivation.insert(record.owner.clone(), record);
        Ok(())
    }

    fn modify(
        &self,
        owner: &str,
        apply: &dyn Fn(MotivationRecord) -> MotivationRecord,
    ) -> StoreResult<MotivationRecord> {
        let mut tables = self.tables.write();
        let current = tables
            .motivation
            .get(owner)
            .cloned()
            .unwrap_or_else(|| MotivationRecord::new(owner));
        let updated = apply(current);
        tables.motivation.insert(owner.to_string(), updated.clone());
        Ok(updated)
    }
}
