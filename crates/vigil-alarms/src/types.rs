//! Core alarm types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two states an alarm can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    Recovered,
    Thrown,
}

impl AlarmState {
    /// Code sent to the notifier for a transition into this state.
    pub fn notify_code(self) -> i32 {
        match self {
            AlarmState::Recovered => 0,
            AlarmState::Thrown => 1,
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmState::Recovered => f.write_str("recovered"),
            AlarmState::Thrown => f.write_str("thrown"),
        }
    }
}

impl FromStr for AlarmState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recovered" | "false" | "0" => Ok(AlarmState::Recovered),
            "thrown" | "true" | "1" => Ok(AlarmState::Thrown),
            other => Err(format!("unknown alarm state: {other}")),
        }
    }
}

/// The in-memory value of one alarm. Each transition installs a fresh
/// `Arc<AlarmInfo>`, so pointer identity doubles as the version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlarmInfo {
    /// Stable identifier, fixed at creation.
    pub id: i32,
    pub state: AlarmState,
}

/// A row as exchanged with an [`AlarmStore`](crate::AlarmStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub name: String,
    pub id: i32,
    pub state: AlarmState,
}

impl AlarmRecord {
    pub fn new(name: impl Into<String>, id: i32, state: AlarmState) -> Self {
        Self {
            name: name.into(),
            id,
            state,
        }
    }
}

/// Result of [`AlarmCoordinator::register`](crate::AlarmCoordinator::register).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// A new alarm was installed in the recovered state.
    Created,
    /// The name was already registered; nothing was changed.
    Existing { id: i32, state: AlarmState },
}

/// Result of [`AlarmCoordinator::transition`](crate::AlarmCoordinator::transition).
///
/// Only [`Applied`](Self::Applied) means the notifier, memory, and store all
/// agree on the new state. The other outcomes say which step stopped the
/// transition, which determines how far the three views may have diverged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// All three steps succeeded.
    Applied,
    /// No alarm under that name. Nothing was contacted.
    NotFound,
    /// The notifier refused delivery. Memory and store are untouched.
    NotDelivered,
    /// Another transition replaced the in-memory state first. The notifier
    /// was contacted; memory and store are untouched by this call.
    LostRace,
    /// Notifier and memory advanced but the store did not.
    NotPersisted,
}

impl TransitionOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, TransitionOutcome::Applied)
    }
}

impl fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransitionOutcome::Applied => "applied",
            TransitionOutcome::NotFound => "alarm not found",
            TransitionOutcome::NotDelivered => "notification not delivered",
            TransitionOutcome::LostRace => "lost race to a concurrent transition",
            TransitionOutcome::NotPersisted => "state not persisted",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_codes() {
        assert_eq!(AlarmState::Thrown.notify_code(), 1);
        assert_eq!(AlarmState::Recovered.notify_code(), 0);
    }

    #[test]
    fn parse_state() {
        assert_eq!("thrown".parse::<AlarmState>().unwrap(), AlarmState::Thrown);
        assert_eq!("False".parse::<AlarmState>().unwrap(), AlarmState::Recovered);
        assert!("maybe".parse::<AlarmState>().is_err());
    }

    #[test]
    fn record_serializes_state_lowercase() {
        let json = serde_json::to_string(&AlarmRecord::new("door", 3, AlarmState::Thrown)).unwrap();
        assert_eq!(json, r#"{"name":"door","id":3,"state":"thrown"}"#);
    }
}
