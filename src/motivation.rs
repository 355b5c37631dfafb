//! Continuation-motivation scoring.
//!
//! Only `points` carries state. `rank` and `level` are recomputed from it on
//! every write so they cannot drift.

use crate::error::EngineResult;
use crate::persistence::MotivationStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Result of a play session as seen by the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure => f.write_str("failure"),
        }
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" | "completed" => Ok(Outcome::Success),
            "failure" | "skipped" => Ok(Outcome::Failure),
            other => Err(format!("unknown play result '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Rank {
    #[default]
    Bronze,
    Silver,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Bronze => "Bronze",
            Rank::Silver => "Silver",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bronze" => Ok(Rank::Bronze),
            "silver" => Ok(Rank::Silver),
            other => Err(format!("unknown rank '{other}'")),
        }
    }
}

/// Bonus, penalty and banding constants for the scoring state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotivationPolicy {
    pub success_bonus: i64,
    pub failure_penalty: i64,
    /// Points strictly above this promote to `Silver`.
    pub silver_threshold: i64,
    /// `level = points mod level_cycle`.
    pub level_cycle: i64,
    pub clamp_at_zero: bool,
}

impl Default for MotivationPolicy {
    fn default() -> Self {
        Self {
            success_bonus: 10,
            failure_penalty: 5,
            silver_threshold: 100,
            level_cycle: 100,
            clamp_at_zero: true,
        }
    }
}

impl MotivationPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.success_bonus < 0 || self.failure_penalty < 0 {
            return Err("motivation bonus and penalty must be non-negative".to_string());
        }
        if self.level_cycle <= 0 {
            return Err(format!(
                "motivation level_cycle must be positive (got {})",
                self.level_cycle
            ));
        }
        Ok(())
    }

    pub fn rank_for(&self, points: i64) -> Rank {
        if points > self.silver_threshold {
            Rank::Silver
        } else {
            Rank::Bronze
        }
    }

    pub fn level_for(&self, points: i64) -> i64 {
        points.rem_euclid(self.level_cycle.max(1))
    }
}

/// Per-owner score. Created lazily with `points = 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationRecord {
    pub owner: String,
    pub points: i64,
    pub rank: Rank,
    pub level: i64,
}

impl MotivationRecord {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            points: 0,
            rank: Rank::Bronze,
            level: 1,
        }
    }
}

/// The scoring transition: adjust points, then rederive rank and level.
pub fn apply_outcome(
    record: MotivationRecord,
    outcome: Outcome,
    policy: &MotivationPolicy,
) -> MotivationRecord {
    let mut points = match outcome {
        Outcome::Success => record.points.saturating_add(policy.success_bonus),
        Outcome::Failure => record.points.saturating_sub(policy.failure_penalty),
    };
    if policy.clamp_at_zero {
        points = points.max(0);
    }
    MotivationRecord {
        owner: record.owner,
        points,
        rank: policy.rank_for(points),
        level: policy.level_for(points),
    }
}

pub struct MotivationEngine {
    store: Arc<dyn MotivationStore>,
    policy: MotivationPolicy,
}

impl MotivationEngine {
    pub fn new(store: Arc<dyn MotivationStore>, policy: MotivationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &MotivationPolicy {
        &self.policy
    }

    /// Current record, or the default one when the owner has never reported.
    pub fn current(&self, owner: &str) -> EngineResult<MotivationRecord> {
        Ok(self
            .store
            .get(owner)?
            .unwrap_or_else(|| MotivationRecord::new(owner)))
    }

    pub fn report_outcome(&self, owner: &str, outcome: Outcome) -> EngineResult<MotivationRecord> {
        let policy = self.policy;
        let updated = self
            .store
            .modify(owner, &|record| apply_outcome(record, outcome, &policy))?;
        info!(
            owner,
            %outcome,
            points = updated.points,
            rank = %updated.rank,
            level = updated.level,
            "motivation updated"
        );
        Ok(updated)
    }
}
