//! Notifications emitted by successful mutating calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::types::{GoalId, Principal};

/// One event per successful `create_goal`, `update_progress` or `complete_goal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GoalEvent {
    GoalCreated {
        goal_id: GoalId,
        owner: Principal,
        title: String,
        created_at: DateTime<Utc>,
    },
    ProgressUpdated {
        goal_id: GoalId,
        owner: Principal,
        updated_at: DateTime<Utc>,
    },
    GoalCompleted {
        goal_id: GoalId,
        owner: Principal,
        completed_at: DateTime<Utc>,
    },
}

impl GoalEvent {
    pub fn goal_id(&self) -> GoalId {
        match self {
            GoalEvent::GoalCreated { goal_id, .. }
            | GoalEvent::ProgressUpdated { goal_id, .. }
            | GoalEvent::GoalCompleted { goal_id, .. } => *goal_id,
        }
    }

    pub fn owner(&self) -> &Principal {
        match self {
            GoalEvent::GoalCreated { owner, .. }
            | GoalEvent::ProgressUpdated { owner, .. }
            | GoalEvent::GoalCompleted { owner, .. } => owner,
        }
    }

    /// When the underlying transaction was admitted.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            GoalEvent::GoalCreated { created_at, .. } => *created_at,
            GoalEvent::ProgressUpdated { updated_at, .. } => *updated_at,
            GoalEvent::GoalCompleted { completed_at, .. } => *completed_at,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GoalEvent::GoalCreated { .. } => "goal_created",
            GoalEvent::ProgressUpdated { .. } => "progress_updated",
            GoalEvent::GoalCompleted { .. } => "goal_completed",
        }
    }
}
