use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Progress of a backlog item. Only `Unstarted` items are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BacklogStatus {
    #[default]
    Unstarted,
    InProgress,
    Completed,
}

impl BacklogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BacklogStatus::Unstarted => "unstarted",
            BacklogStatus::InProgress => "in_progress",
            BacklogStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BacklogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BacklogStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unstarted" => Ok(BacklogStatus::Unstarted),
            "in_progress" | "playing" => Ok(BacklogStatus::InProgress),
            "completed" => Ok(BacklogStatus::Completed),
            other => Err(format!("unknown backlog status '{other}'")),
        }
    }
}

/// A game waiting in a user's backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: String,
    pub owner: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default)]
    pub status: BacklogStatus,
}

impl BacklogItem {
    pub fn new(id: impl Into<String>, owner: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            title: title.into(),
            genre: None,
            status: BacklogStatus::Unstarted,
        }
    }

    pub fn with_status(mut self, status: BacklogStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn is_unstarted(&self) -> bool {
        self.status == BacklogStatus::Unstarted
    }
}
