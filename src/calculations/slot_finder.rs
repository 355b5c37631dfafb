use crate::calendar::{BusinessHours, TimeRange};
use chrono::{Duration, NaiveDateTime};
use tracing::debug;

/// First-fit search for the earliest start at or after `earliest_start` whose
/// `[start, start + duration)` window misses every busy interval.
///
/// Busy intervals are scanned in the order given.
pub fn find_slot(
    earliest_start: NaiveDateTime,
    duration: Duration,
    busy: &[TimeRange],
) -> NaiveDateTime {
    let hours = BusinessHours::STANDARD;
    let mut candidate = hours.clamp(earliest_start);
    loop {
        let window = TimeRange::starting_at(candidate, duration);
        // A blocker is never hit twice: the candidate only moves forward past its end.
        match busy.iter().find(|blocker| blocker.overlaps(&window)) {
            Some(blocker) => {
                debug!(
                    candidate = %candidate,
                    blocked_until = %blocker.end,
                    "slot candidate collides with busy interval"
                );
                candidate = hours.clamp(blocker.end);
            }
            None => return candidate,
        }
    }
}

/// Busy intervals for one generation run, sorted once by start.
///
/// `reach[i]` is the latest end among `busy[..=i]`, so every blocker before
/// the first `reach` past the candidate is already behind it.
#[derive(Debug, Clone, Default)]
pub struct BusyTimeline {
    hours: BusinessHours,
    busy: Vec<TimeRange>,
    reach: Vec<NaiveDateTime>,
}

impl BusyTimeline {
    pub fn new<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = TimeRange>,
    {
        let mut busy: Vec<TimeRange> = ranges.into_iter().collect();
        busy.sort();
        let reach = busy
            .iter()
            .scan(None, |latest: &mut Option<NaiveDateTime>, range| {
                let end = latest.map_or(range.end, |seen| seen.max(range.end));
                *latest = Some(end);
                Some(end)
            })
            .collect();
        Self {
            hours: BusinessHours::STANDARD,
            busy,
            reach,
        }
    }

    pub fn busy(&self) -> &[TimeRange] {
        &self.busy
    }

    pub fn is_empty(&self) -> bool {
        self.busy.is_empty()
    }

    /// Same result as [`find_slot`] over the sorted intervals, without
    /// rescanning blockers the candidate has already passed.
    pub fn find_slot(&self, earliest_start: NaiveDateTime, duration: Duration) -> TimeRange {
        let mut candidate = self.hours.clamp(earliest_start);
        loop {
            let window_end = candidate + duration;
            let live_from = self.reach.partition_point(|end| *end <= candidate);
            let blocker = self.busy[live_from..]
                .iter()
                .take_while(|blocker| blocker.start < window_end)
                .find(|blocker| blocker.end > candidate);
            match blocker {
                Some(blocker) => {
                    debug!(
                        candidate = %candidate,
                        blocked_until = %blocker.end,
                        "slot candidate collides with busy interval"
                    );
                    candidate = self.hours.clamp(blocker.end);
                }
                None => return TimeRange::starting_at(candidate, duration),
            }
        }
    }
}
