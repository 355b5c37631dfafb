pub mod backlog;
pub mod calculations;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod fixed_event;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod motivation;
pub mod persistence;
pub mod schedule;
pub mod session;
pub mod validation;

pub use backlog::{BacklogItem, BacklogStatus};
pub use calculations::{BusyTimeline, find_slot};
pub use calendar::{
    BusinessHours, TimeRange, clamp_to_business_hours, overlaps, parse_local_datetime,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, ConfigError, EngineConfig, ServerConfig};
pub use error::{EngineError, EngineResult};
pub use fixed_event::FixedInterval;
pub use motivation::{
    MotivationEngine, MotivationPolicy, MotivationRecord, Outcome, Rank, apply_outcome,
};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteStore;
pub use persistence::{
    BacklogStore, FixedEventStore, InMemoryStore, MotivationStore, ScheduleStore, StoreError,
    load_sessions_from_json, save_sessions_to_csv, save_sessions_to_json,
};
pub use schedule::{GenerationReport, Scheduler, StatusUpdate, Stores};
pub use session::{Session, SessionStatus};
