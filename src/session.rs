use crate::calendar::TimeRange;
use crate::motivation::Outcome;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Completed,
    Skipped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Scheduled)
    }

    /// Outcome reported to the motivation engine; `None` for `Scheduled`.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            SessionStatus::Scheduled => None,
            SessionStatus::Completed => Some(Outcome::Success),
            SessionStatus::Skipped => Some(Outcome::Failure),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "completed" => Ok(SessionStatus::Completed),
            "skipped" => Ok(SessionStatus::Skipped),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// One generated play block pairing a backlog item with a time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub owner: String,
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_title: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub status: SessionStatus,
}

impl Session {
    pub fn scheduled(
        id: impl Into<String>,
        owner: impl Into<String>,
        item_id: impl Into<String>,
        range: TimeRange,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            item_id: item_id.into(),
            item_title: None,
            start: range.start,
            end: range.end,
            status: SessionStatus::Scheduled,
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}
