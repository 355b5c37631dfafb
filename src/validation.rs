use crate::fixed_event::FixedInterval;
use crate::session::Session;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SessionValidationError {
    message: String,
}

impl SessionValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn validate_session(session: &Session) -> Result<(), SessionValidationError> {
    if session.id.trim().is_empty() {
        return Err(SessionValidationError::new("session id must not be empty"));
    }
    if session.start >= session.end {
        return Err(SessionValidationError::new(format!(
            "session {} must start before it ends (start {}, end {})",
            session.id, session.start, session.end
        )));
    }
    Ok(())
}

/// Ids are unique and sessions of the same owner are pairwise disjoint.
pub fn validate_sessions(sessions: &[Session]) -> Result<(), SessionValidationError> {
    let mut seen = HashSet::with_capacity(sessions.len());
    let mut by_owner: HashMap<&str, Vec<&Session>> = HashMap::new();

    for session in sessions {
        validate_session(session)?;
        if !seen.insert(session.id.as_str()) {
            return Err(SessionValidationError::new(format!(
                "duplicate session id {}",
                session.id
            )));
        }
        by_owner.entry(session.owner.as_str()).or_default().push(session);
    }

    for owned in by_owner.values_mut() {
        owned.sort_by_key(|session| session.start);
        for pair in owned.windows(2) {
            if pair[0].range().overlaps(&pair[1].range()) {
                return Err(SessionValidationError::new(format!(
                    "sessions {} and {} overlap",
                    pair[0].id, pair[1].id
                )));
            }
        }
    }
    Ok(())
}

/// Every session misses every fixed interval of the same owner.
pub fn validate_against_fixed(
    sessions: &[Session],
    fixed: &[FixedInterval],
) -> Result<(), SessionValidationError> {
    for session in sessions {
        let clash = fixed
            .iter()
            .filter(|interval| interval.owner == session.owner)
            .find(|interval| interval.range().overlaps(&session.range()));
        if let Some(interval) = clash {
            return Err(SessionValidationError::new(format!(
                "session {} overlaps fixed event {} ({})",
                session.id, interval.id, interval.title
            )));
        }
    }
    Ok(())
}
