use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// The daily window in which sessions may start, in local civil time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl BusinessHours {
    /// `[09:00, 23:00)`, fixed for every owner.
    pub const STANDARD: BusinessHours = BusinessHours {
        open_hour: 9,
        close_hour: 23,
    };

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        let hour = t.hour();
        hour >= self.open_hour && hour < self.close_hour
    }

    /// Moves `t` to the opening of the next calendar day when it falls outside the window.
    pub fn clamp(&self, t: NaiveDateTime) -> NaiveDateTime {
        if self.contains(t) {
            return t;
        }
        let next_day = t.date() + Duration::days(1);
        let opening = NaiveTime::from_hms_opt(self.open_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        next_day.and_time(opening)
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Half-open `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn starting_at(start: NaiveDateTime, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// True iff the half-open intervals share at least one instant. Touching endpoints do not overlap.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

pub fn clamp_to_business_hours(t: NaiveDateTime) -> NaiveDateTime {
    BusinessHours::STANDARD.clamp(t)
}

/// Parses an RFC 3339 instant (converted to local civil time) or a naive
/// `YYYY-MM-DDTHH:MM[:SS]` / `YYYY-MM-DD HH:MM[:SS]` timestamp.
pub fn parse_local_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Local).naive_local());
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| format!("unparseable time '{raw}' (use RFC 3339 or YYYY-MM-DDTHH:MM)"))
}
