use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::job::TimestampField;

/// The eight dispatch states a job can be in.
///
/// The normal flow is `Scheduled → En route to collection → Onsite at collection
/// → Loaded → En route to delivery → Onsite at delivery → Completed`, with
/// `Cancelled` reachable from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Scheduled,
    #[serde(rename = "En route to collection")]
    EnRouteToCollection,
    #[serde(rename = "Onsite at collection")]
    OnsiteAtCollection,
    Loaded,
    #[serde(rename = "En route to delivery")]
    EnRouteToDelivery,
    #[serde(rename = "Onsite at delivery")]
    OnsiteAtDelivery,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Scheduled,
        JobStatus::EnRouteToCollection,
        JobStatus::OnsiteAtCollection,
        JobStatus::Loaded,
        JobStatus::EnRouteToDelivery,
        JobStatus::OnsiteAtDelivery,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Scheduled => "Scheduled",
            JobStatus::EnRouteToCollection => "En route to collection",
            JobStatus::OnsiteAtCollection => "Onsite at collection",
            JobStatus::Loaded => "Loaded",
            JobStatus::EnRouteToDelivery => "En route to delivery",
            JobStatus::OnsiteAtDelivery => "Onsite at delivery",
            JobStatus::Completed => "Completed",
            JobStatus::Cancelled => "Cancelled",
        }
    }

    /// No further auto-stamping happens once a job is in one of these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Position along the forward flow. `Cancelled` sits outside it.
    fn rank(&self) -> Option<u8> {
        match self {
            JobStatus::Scheduled => Some(0),
            JobStatus::EnRouteToCollection => Some(1),
            JobStatus::OnsiteAtCollection => Some(2),
            JobStatus::Loaded => Some(3),
            JobStatus::EnRouteToDelivery => Some(4),
            JobStatus::OnsiteAtDelivery => Some(5),
            JobStatus::Completed => Some(6),
            JobStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a requested status is not one of the eight known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {0:?}")]
pub struct InvalidStatus(pub String);

impl FromStr for JobStatus {
    type Err = InvalidStatus;

    /// Exact match against the display names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

/// What a requested transition does to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffects {
    /// The status the record ends up in, always the requested one.
    pub status: JobStatus,
    /// The lifecycle timestamp to stamp with the current instant, if any.
    pub stamp: Option<TimestampField>,
    /// Whether the transition should also try to refresh the ETA.
    pub resolve_eta: bool,
}

/// Maps requested statuses to their timestamp effects.
///
/// The engine records when each milestone happened; it does not decide whether
/// a transition is allowed. Ordering checks live in [`TransitionPolicy`].
pub struct LifecycleEngine;

impl LifecycleEngine {
    /// Parse the requested status and compute its effects.
    pub fn compute_transition_effects(target: &str) -> Result<TransitionEffects, InvalidStatus> {
        let status: JobStatus = target.parse()?;
        Ok(Self::effects_for(status))
    }

    pub fn effects_for(status: JobStatus) -> TransitionEffects {
        let stamp = match status {
            JobStatus::EnRouteToCollection => Some(TimestampField::TimeEnRouteToCollection),
            JobStatus::OnsiteAtCollection => Some(TimestampField::TimeArrivedAtCollection),
            JobStatus::Loaded => Some(TimestampField::TimeLoaded),
            JobStatus::EnRouteToDelivery => Some(TimestampField::TimeEnRouteToDelivery),
            JobStatus::OnsiteAtDelivery => Some(TimestampField::TimeArrivedAtDelivery),
            JobStatus::Completed => Some(TimestampField::TimeCompleted),
            JobStatus::Scheduled | JobStatus::Cancelled => None,
        };
        TransitionEffects {
            status,
            stamp,
            resolve_eta: status == JobStatus::Loaded,
        }
    }
}

/// Optional guard on which transitions are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may be requested from any status.
    #[default]
    Permissive,
    /// Only the same or a later state, or `Cancelled` from a non-terminal state.
    Forward,
}

impl TransitionPolicy {
    pub fn allows(&self, current: JobStatus, target: JobStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Forward => {
                if current == target {
                    return true;
                }
                if current.is_terminal() {
                    return false;
                }
                match (current.rank(), target.rank()) {
                    (_, None) => true,
                    (Some(from), Some(to)) => to > from,
                    (None, Some(_)) => false,
                }
            }
        }
    }
}
