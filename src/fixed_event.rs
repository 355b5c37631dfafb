use crate::calendar::TimeRange;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An immovable commitment (work, class, ...) that generated sessions must avoid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedInterval {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl FixedInterval {
    /// Builds a fixed interval, rejecting empty or inverted ranges.
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Self, String> {
        let interval = Self {
            id: id.into(),
            owner: owner.into(),
            title: title.into(),
            start,
            end,
        };
        interval.validate()?;
        Ok(interval)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.start >= self.end {
            return Err(format!(
                "fixed event '{}' must start before it ends (start {}, end {})",
                self.id, self.start, self.end
            ));
        }
        Ok(())
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}
