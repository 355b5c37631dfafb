use crate::backlog::BacklogItem;
use crate::calculations::BusyTimeline;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fixed_event::FixedInterval;
use crate::motivation::{MotivationEngine, MotivationRecord, Outcome};
use crate::persistence::{BacklogStore, FixedEventStore, MotivationStore, ScheduleStore};
use crate::session::{Session, SessionStatus};
use chrono::{Duration, NaiveDateTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The storage collaborators a [`Scheduler`] runs against.
#[derive(Clone)]
pub struct Stores {
    pub backlog: Arc<dyn BacklogStore>,
    pub fixed_events: Arc<dyn FixedEventStore>,
    pub sessions: Arc<dyn ScheduleStore>,
    pub motivation: Arc<dyn MotivationStore>,
}

impl Stores {
    /// Uses one backend for every concern.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: BacklogStore + FixedEventStore + ScheduleStore + MotivationStore + 'static,
    {
        Self {
            backlog: store.clone(),
            fixed_events: store.clone(),
            sessions: store.clone(),
            motivation: store,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub owner: String,
    pub generated_at: NaiveDateTime,
    pub sessions: Vec<Session>,
    /// Backlog items that did not fit before the horizon ended.
    pub unscheduled: Vec<String>,
}

impl GenerationReport {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.unscheduled.is_empty()
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = vec![format!("sessions={}", self.sessions.len())];
        if let (Some(first), Some(last)) = (self.sessions.first(), self.sessions.last()) {
            parts.push(format!("first={}", first.start.format("%Y-%m-%d %H:%M")));
            parts.push(format!("last_end={}", last.end.format("%Y-%m-%d %H:%M")));
        }
        if !self.unscheduled.is_empty() {
            parts.push(format!("unscheduled={}", self.unscheduled.len()));
        }
        parts.join(", ")
    }
}

/// The session after a terminal transition plus the score it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub session: Session,
    pub motivation: MotivationRecord,
}

pub struct Scheduler {
    stores: Stores,
    motivation: MotivationEngine,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    generation_gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Scheduler {
    pub fn new(stores: Stores, config: EngineConfig) -> Self {
        let motivation = MotivationEngine::new(stores.motivation.clone(), config.motivation);
        Self {
            stores,
            motivation,
            clock: Arc::new(SystemClock),
            config,
            generation_gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_store<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: BacklogStore + FixedEventStore + ScheduleStore + MotivationStore + 'static,
    {
        Self::new(Stores::shared(store), config)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    fn generation_gate(&self, owner: &str) -> Arc<Mutex<()>> {
        let mut gates = self.generation_gates.lock();
        gates.entry(owner.to_string()).or_default().clone()
    }

    /// Drops the owner's gate once no other run holds or waits on it.
    fn release_generation_gate(&self, owner: &str, gate: Arc<Mutex<()>>) {
        let mut gates = self.generation_gates.lock();
        // One reference lives in the map, the other is `gate`.
        if Arc::strong_count(&gate) == 2 {
            gates.remove(owner);
        }
    }

    fn require_owner(owner: &str) -> EngineResult<()> {
        if owner.trim().is_empty() {
            return Err(EngineError::invalid("owner must not be empty"));
        }
        Ok(())
    }

    /// Replaces the owner's generated schedule and returns the new batch.
    pub fn generate(&self, owner: &str) -> EngineResult<Vec<Session>> {
        self.generate_report(owner).map(|report| report.sessions)
    }

    /// Pulls the unstarted backlog, chains one session per item after the
    /// previous one (first-fit around fixed intervals), and swaps the batch in.
    ///
    /// An empty backlog leaves the previous schedule untouched.
    pub fn generate_report(&self, owner: &str) -> EngineResult<GenerationReport> {
        Self::require_owner(owner)?;
        let gate = self.generation_gate(owner);
        let result = {
            let _serialized = gate.lock();
            self.generate_serialized(owner)
        };
        self.release_generation_gate(owner, gate);
        result
    }

    fn generate_serialized(&self, owner: &str) -> EngineResult<GenerationReport> {
        let now = self.clock.now();
        let items = self.stores.backlog.list_unstarted(owner)?;
        if items.is_empty() {
            if self.config.fail_on_empty_backlog {
                return Err(EngineError::EmptyBacklog(owner.to_string()));
            }
            info!(owner, "no unstarted backlog items; schedule left unchanged");
            return Ok(GenerationReport {
                owner: owner.to_string(),
                generated_at: now,
                sessions: Vec::new(),
                unscheduled: Vec::new(),
            });
        }

        let horizon_end = self
            .config
            .horizon()
            .and_then(|horizon| now.checked_add_signed(horizon))
            .ok_or_else(|| {
                EngineError::invalid(format!(
                    "generation horizon of {} days is out of range",
                    self.config.horizon_days
                ))
            })?;
        let duration = self
            .config
            .session_duration()
            .filter(|duration| *duration > Duration::zero())
            .ok_or_else(|| {
                EngineError::invalid(format!(
                    "session length of {} minutes is out of range",
                    self.config.session_minutes
                ))
            })?;
        let fixed = self
            .stores
            .fixed_events
            .list_by_owner_in_range(owner, now, horizon_end)?;
        let timeline = BusyTimeline::new(fixed.iter().map(FixedInterval::range));
        let (sessions, unscheduled) =
            Self::assign(owner, &items, &timeline, duration, now, horizon_end);

        self.stores
            .sessions
            .replace_all_for_owner(owner, sessions.clone())?;

        if !unscheduled.is_empty() {
            warn!(
                owner,
                count = unscheduled.len(),
                horizon_end = %horizon_end,
                "backlog items did not fit before the horizon"
            );
        }
        info!(
            owner,
            sessions = sessions.len(),
            fixed_events = fixed.len(),
            "schedule generated"
        );

        Ok(GenerationReport {
            owner: owner.to_string(),
            generated_at: now,
            sessions,
            unscheduled,
        })
    }

    fn assign(
        owner: &str,
        items: &[BacklogItem],
        timeline: &BusyTimeline,
        duration: Duration,
        now: NaiveDateTime,
        horizon_end: NaiveDateTime,
    ) -> (Vec<Session>, Vec<String>) {
        let mut sessions = Vec::with_capacity(items.len());
        let mut cursor = now;

        for (idx, item) in items.iter().enumerate() {
            let slot = timeline.find_slot(cursor, duration);
            if slot.end > horizon_end {
                // Sessions are chained, so every later item lands even further out.
                let unscheduled = items[idx..].iter().map(|item| item.id.clone()).collect();
                return (sessions, unscheduled);
            }
            debug!(owner, item = %item.id, start = %slot.start, end = %slot.end, "placed session");
            let mut session = Session::scheduled(Uuid::new_v4().to_string(), owner, &item.id, slot);
            session.item_title = Some(item.title.clone());
            sessions.push(session);
            cursor = slot.end;
        }
        (sessions, Vec::new())
    }

    /// Marks a session `Completed` or `Skipped` and feeds the outcome to the
    /// motivation engine.
    ///
    /// Only `Scheduled` sessions can transition; repeating a terminal update
    /// fails with `NotFound` and awards nothing. When the status write lands
    /// but scoring fails, the write is kept and `PartialEffect` is returned.
    pub fn update_status(&self, session_id: &str, status: SessionStatus) -> EngineResult<StatusUpdate> {
        let Some(outcome) = status.outcome() else {
            return Err(EngineError::invalid(format!(
                "session {session_id} cannot be moved back to {status}"
            )));
        };

        let session = self.stores.sessions.update_status(session_id, status)?;
        info!(session = %session.id, owner = %session.owner, %status, "session status updated");

        match self.motivation.report_outcome(&session.owner, outcome) {
            Ok(motivation) => Ok(StatusUpdate {
                session,
                motivation,
            }),
            Err(err) => {
                warn!(session = %session.id, error = %err, "status written but motivation update failed");
                Err(EngineError::PartialEffect {
                    session: Box::new(session),
                    source: Box::new(err),
                })
            }
        }
    }

    /// Same as [`Scheduler::update_status`] with the status given as text.
    pub fn update_status_str(&self, session_id: &str, status: &str) -> EngineResult<StatusUpdate> {
        let status: SessionStatus = status.parse().map_err(EngineError::InvalidInput)?;
        self.update_status(session_id, status)
    }

    /// [`Scheduler::update_status`] for a session that must belong to `owner`.
    /// Other owners' sessions are reported as `NotFound`.
    pub fn update_owned_status(
        &self,
        owner: &str,
        session_id: &str,
        status: SessionStatus,
    ) -> EngineResult<StatusUpdate> {
        let session = self.get_session(session_id)?;
        if session.owner != owner {
            return Err(EngineError::not_found(format!("session {session_id}")));
        }
        self.update_status(session_id, status)
    }

    /// Play-result reporting scoped to `owner`; routed through the status
    /// transition so one session never scores twice.
    pub fn report_play_result(
        &self,
        owner: &str,
        session_id: &str,
        outcome: Outcome,
    ) -> EngineResult<StatusUpdate> {
        let status = match outcome {
            Outcome::Success => SessionStatus::Completed,
            Outcome::Failure => SessionStatus::Skipped,
        };
        self.update_owned_status(owner, session_id, status)
    }

    pub fn get_session(&self, session_id: &str) -> EngineResult<Session> {
        self.stores
            .sessions
            .get(session_id)?
            .ok_or_else(|| EngineError::not_found(format!("session {session_id}")))
    }

    pub fn list_sessions(&self, owner: &str) -> EngineResult<Vec<Session>> {
        Ok(self.stores.sessions.list_by_owner(owner)?)
    }

    pub fn list_sessions_in_range(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> EngineResult<Vec<Session>> {
        if start >= end {
            return Err(EngineError::invalid(format!(
                "range start {start} must be before end {end}"
            )));
        }
        Ok(self
            .stores
            .sessions
            .list_by_owner_in_range(owner, start, end)?)
    }

    pub fn create_backlog_item(
        &self,
        owner: &str,
        title: &str,
        genre: Option<&str>,
    ) -> EngineResult<BacklogItem> {
        Self::require_owner(owner)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(EngineError::invalid("backlog item title must not be empty"));
        }
        let mut item = BacklogItem::new(Uuid::new_v4().to_string(), owner, title);
        item.genre = genre.map(str::to_string);
        self.stores.backlog.create(item.clone())?;
        info!(owner, item = %item.id, "backlog item created");
        Ok(item)
    }

    pub fn list_backlog(&self, owner: &str) -> EngineResult<Vec<BacklogItem>> {
        Ok(self.stores.backlog.list_by_owner(owner)?)
    }

    pub fn list_unstarted(&self, owner: &str) -> EngineResult<Vec<BacklogItem>> {
        Ok(self.stores.backlog.list_unstarted(owner)?)
    }

    pub fn create_fixed_event(
        &self,
        owner: &str,
        title: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> EngineResult<FixedInterval> {
        Self::require_owner(owner)?;
        let event = FixedInterval::new(Uuid::new_v4().to_string(), owner, title.trim(), start, end)
            .map_err(EngineError::InvalidInput)?;
        self.stores.fixed_events.create(event.clone())?;
        info!(owner, event = %event.id, start = %start, end = %end, "fixed event created");
        Ok(event)
    }

    pub fn list_fixed_events(&self, owner: &str) -> EngineResult<Vec<FixedInterval>> {
        Ok(self.stores.fixed_events.list_by_owner(owner)?)
    }

    pub fn motivation(&self, owner: &str) -> EngineResult<MotivationRecord> {
        self.motivation.current(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::persistence::InMemoryStore;
    use chrono::NaiveDate;

    fn scheduler() -> Scheduler {
        let now = NaiveDate::from_ymd_opt(2025, 11, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Scheduler::with_store(Arc::new(InMemoryStore::new()), EngineConfig::default())
            .with_clock(Arc::new(FixedClock(now)))
    }

    #[test]
    fn generation_gates_are_released_after_each_run() {
        let scheduler = scheduler();
        for idx in 0..50 {
            let owner = format!("owner-{idx}");
            scheduler.create_backlog_item(&owner, "Tetris", None).unwrap();
            scheduler.generate(&owner).unwrap();
        }
        scheduler.generate("nobody").unwrap();
        assert!(scheduler.generation_gates.lock().is_empty());
    }

    #[test]
    fn gate_survives_while_another_run_holds_it() {
        let scheduler = scheduler();
        let held = scheduler.generation_gate("u1");
        scheduler.generate("u1").unwrap();
        assert_eq!(scheduler.generation_gates.lock().len(), 1);
        scheduler.release_generation_gate("u1", held);
        assert!(scheduler.generation_gates.lock().is_empty());
    }
}
