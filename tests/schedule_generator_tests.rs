use chrono::{Duration, NaiveDate, NaiveDateTime};
use game_scheduler::{
    BacklogItem, BacklogStatus, BacklogStore, EngineConfig, EngineError, FixedClock,
    FixedEventStore, FixedInterval, InMemoryStore, ScheduleStore, Scheduler, SessionStatus,
    overlaps,
};
use std::sync::Arc;
use std::thread;

fn dt(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn scheduler_at(store: &Arc<InMemoryStore>, now: NaiveDateTime, config: EngineConfig) -> Scheduler {
    Scheduler::with_store(store.clone(), config).with_clock(Arc::new(FixedClock(now)))
}

fn add_games(store: &InMemoryStore, owner: &str, titles: &[&str]) {
    for (idx, title) in titles.iter().enumerate() {
        BacklogStore::create(store, BacklogItem::new(format!("{owner}-g{idx}"), owner, *title))
            .unwrap();
    }
}

fn add_fixed(store: &InMemoryStore, id: &str, owner: &str, start: NaiveDateTime, end: NaiveDateTime) {
    FixedEventStore::create(store, FixedInterval::new(id, owner, "Work", start, end).unwrap())
        .unwrap();
}

#[test]
fn sessions_follow_fixed_event_tomorrow() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["Zelda", "FFXIV"]);
    add_fixed(&store, "work", "u1", dt(11, 9, 0), dt(11, 17, 0));

    // Late evening: today's window is closed, so placement starts tomorrow.
    let scheduler = scheduler_at(&store, dt(10, 23, 30), EngineConfig::default());
    let sessions = scheduler.generate("u1").unwrap();

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].start, dt(11, 17, 0));
    assert_eq!(sessions[0].end, dt(11, 18, 0));
    assert_eq!(sessions[0].item_id, "u1-g0");
    assert_eq!(sessions[0].item_title.as_deref(), Some("Zelda"));
    assert!(sessions[1].start >= sessions[0].end);
    assert_eq!(sessions[1].start, dt(11, 18, 0));
    assert!(sessions.iter().all(|s| s.status == SessionStatus::Scheduled));
    assert_ne!(sessions[0].id, sessions[1].id);
}

#[test]
fn first_session_starts_now_when_free() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["Zelda"]);
    add_fixed(&store, "work", "u1", dt(11, 9, 0), dt(11, 17, 0));

    let scheduler = scheduler_at(&store, dt(10, 10, 0), EngineConfig::default());
    let sessions = scheduler.generate("u1").unwrap();
    assert_eq!(sessions[0].start, dt(10, 10, 0));
}

#[test]
fn generated_sessions_are_disjoint_from_each_other_and_fixed_events() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A", "B", "C", "D", "E", "F", "G", "H"]);
    add_fixed(&store, "f1", "u1", dt(10, 12, 0), dt(10, 13, 30));
    add_fixed(&store, "f2", "u1", dt(10, 14, 0), dt(10, 20, 0));
    add_fixed(&store, "f3", "u1", dt(10, 21, 0), dt(11, 10, 0));
    add_fixed(&store, "f4", "u1", dt(11, 10, 30), dt(11, 11, 0));

    let config = EngineConfig {
        session_minutes: 90,
        ..EngineConfig::default()
    };
    let scheduler = scheduler_at(&store, dt(10, 9, 45), config);
    let sessions = scheduler.generate("u1").unwrap();
    assert_eq!(sessions.len(), 8);

    let fixed = FixedEventStore::list_by_owner(store.as_ref(), "u1").unwrap();
    for (i, a) in sessions.iter().enumerate() {
        assert_eq!(a.end - a.start, Duration::minutes(90));
        for b in sessions.iter().skip(i + 1) {
            assert!(!overlaps(a.start, a.end, b.start, b.end), "{a:?} vs {b:?}");
            assert!(b.start >= a.end, "sessions must keep backlog order");
        }
        for f in &fixed {
            assert!(!overlaps(a.start, a.end, f.start, f.end), "{a:?} vs {f:?}");
        }
    }
    game_scheduler::validation::validate_against_fixed(&sessions, &fixed).unwrap();
}

#[test]
fn regeneration_replaces_previous_batch() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A", "B", "C"]);
    let scheduler = scheduler_at(&store, dt(10, 9, 0), EngineConfig::default());

    let first = scheduler.generate("u1").unwrap();
    let second = scheduler.generate("u1").unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);

    let listed = scheduler.list_sessions("u1").unwrap();
    assert_eq!(listed.len(), 3);
    let listed_ids: Vec<_> = listed.iter().map(|s| s.id.clone()).collect();
    assert!(second.iter().all(|s| listed_ids.contains(&s.id)));
    assert!(first.iter().all(|s| !listed_ids.contains(&s.id)));
}

#[test]
fn regeneration_leaves_other_owners_alone() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A"]);
    add_games(&store, "u2", &["B", "C"]);
    let scheduler = scheduler_at(&store, dt(10, 9, 0), EngineConfig::default());

    scheduler.generate("u2").unwrap();
    scheduler.generate("u1").unwrap();
    scheduler.generate("u1").unwrap();

    assert_eq!(scheduler.list_sessions("u1").unwrap().len(), 1);
    assert_eq!(scheduler.list_sessions("u2").unwrap().len(), 2);
}

#[test]
fn only_unstarted_items_are_scheduled() {
    let store = Arc::new(InMemoryStore::new());
    BacklogStore::create(store.as_ref(), BacklogItem::new("a", "u1", "Fresh")).unwrap();
    BacklogStore::create(
        store.as_ref(),
        BacklogItem::new("b", "u1", "Halfway").with_status(BacklogStatus::InProgress),
    )
    .unwrap();
    BacklogStore::create(
        store.as_ref(),
        BacklogItem::new("c", "u1", "Done").with_status(BacklogStatus::Completed),
    )
    .unwrap();

    let scheduler = scheduler_at(&store, dt(10, 9, 0), EngineConfig::default());
    let sessions = scheduler.generate("u1").unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].item_id, "a");
}

#[test]
fn empty_backlog_is_a_no_op_by_default() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A"]);
    let scheduler = scheduler_at(&store, dt(10, 9, 0), EngineConfig::default());
    scheduler.generate("u1").unwrap();

    let report = scheduler.generate_report("u2").unwrap();
    assert!(report.sessions.is_empty());
    assert!(report.is_empty());
    assert_eq!(scheduler.list_sessions("u1").unwrap().len(), 1);
}

#[test]
fn empty_backlog_can_be_reported_as_error() {
    let store = Arc::new(InMemoryStore::new());
    let config = EngineConfig {
        fail_on_empty_backlog: true,
        ..EngineConfig::default()
    };
    let scheduler = scheduler_at(&store, dt(10, 9, 0), config);
    let err = scheduler.generate("u1").unwrap_err();
    assert!(matches!(err, EngineError::EmptyBacklog(owner) if owner == "u1"));
}

#[test]
fn items_beyond_horizon_are_reported_unscheduled() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A", "B", "C"]);
    add_fixed(&store, "trip", "u1", dt(10, 10, 0), dt(11, 12, 0));
    let config = EngineConfig {
        horizon_days: 1,
        ..EngineConfig::default()
    };
    let scheduler = scheduler_at(&store, dt(10, 9, 0), config);

    let report = scheduler.generate_report("u1").unwrap();
    assert_eq!(report.sessions.len(), 1);
    assert_eq!(report.sessions[0].start, dt(10, 9, 0));
    assert_eq!(report.unscheduled, vec!["u1-g1".to_string(), "u1-g2".to_string()]);
    assert!(report.to_cli_summary().contains("unscheduled=2"));
}

#[test]
fn fixed_events_of_other_owners_are_ignored() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A"]);
    add_fixed(&store, "other", "u2", dt(10, 9, 0), dt(10, 18, 0));
    let scheduler = scheduler_at(&store, dt(10, 9, 0), EngineConfig::default());
    assert_eq!(scheduler.generate("u1").unwrap()[0].start, dt(10, 9, 0));
}

#[test]
fn blank_owner_is_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = scheduler_at(&store, dt(10, 9, 0), EngineConfig::default());
    assert!(matches!(
        scheduler.generate("  "),
        Err(EngineError::InvalidInput(_))
    ));
}

#[test]
fn fixed_event_creation_validates_range() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = scheduler_at(&store, dt(10, 9, 0), EngineConfig::default());

    let err = scheduler
        .create_fixed_event("u1", "Backwards", dt(10, 12, 0), dt(10, 11, 0))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    let err = scheduler
        .create_fixed_event("u1", "Empty", dt(10, 12, 0), dt(10, 12, 0))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let event = scheduler
        .create_fixed_event("u1", "Class", dt(10, 12, 0), dt(10, 13, 0))
        .unwrap();
    assert_eq!(scheduler.list_fixed_events("u1").unwrap(), vec![event.clone()]);

    let duplicate = FixedEventStore::create(store.as_ref(), event).unwrap_err();
    assert!(duplicate.to_string().contains("already exists"));
}

#[test]
fn sessions_can_be_listed_by_range() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A", "B", "C"]);
    let scheduler = scheduler_at(&store, dt(10, 9, 0), EngineConfig::default());
    scheduler.generate("u1").unwrap();

    let middle = scheduler
        .list_sessions_in_range("u1", dt(10, 10, 0), dt(10, 11, 0))
        .unwrap();
    assert_eq!(middle.len(), 1);
    assert_eq!(middle[0].item_id, "u1-g1");

    let spanning = scheduler
        .list_sessions_in_range("u1", dt(10, 9, 30), dt(10, 10, 30))
        .unwrap();
    assert_eq!(spanning.len(), 2);

    assert!(matches!(
        scheduler.list_sessions_in_range("u1", dt(10, 11, 0), dt(10, 10, 0)),
        Err(EngineError::InvalidInput(_))
    ));
}

#[test]
fn concurrent_generation_for_one_owner_never_mixes_batches() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A", "B", "C", "D"]);
    let scheduler = Arc::new(scheduler_at(&store, dt(10, 9, 0), EngineConfig::default()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let scheduler = scheduler.clone();
            thread::spawn(move || scheduler.generate("u1").unwrap())
        })
        .collect();
    let batches: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let listed = ScheduleStore::list_by_owner(store.as_ref(), "u1").unwrap();
    assert_eq!(listed.len(), 4);
    let winner = batches
        .iter()
        .find(|batch| batch.iter().any(|s| s.id == listed[0].id))
        .expect("stored batch comes from one run");
    for session in &listed {
        assert!(winner.iter().any(|s| s.id == session.id));
    }
}

#[test]
fn out_of_range_horizon_is_invalid_input() {
    for horizon_days in [200_000_000_000_000, 100_000_000] {
        let store = Arc::new(InMemoryStore::new());
        add_games(&store, "u1", &["A"]);
        let config = EngineConfig {
            horizon_days,
            ..EngineConfig::default()
        };
        let scheduler = scheduler_at(&store, dt(10, 9, 0), config);
        assert!(matches!(
            scheduler.generate("u1"),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(scheduler.list_sessions("u1").unwrap().is_empty());
    }
}

#[test]
fn non_positive_session_length_is_invalid_input() {
    let store = Arc::new(InMemoryStore::new());
    add_games(&store, "u1", &["A"]);
    let config = EngineConfig {
        session_minutes: 0,
        ..EngineConfig::default()
    };
    let scheduler = scheduler_at(&store, dt(10, 9, 0), config);
    assert!(matches!(
        scheduler.generate("u1"),
        Err(EngineError::InvalidInput(_))
    ));
}
