//! Job lifecycle state machine.
//!
//! ```text
//! Pending ──> InProgress ──> Completed
//!                  │    └──> Failed
//!                  └──────> Locked   (superseded by a newer job)
//! ```
//!
//! `InProgress`, `Completed` and `Failed` are driven by the execution
//! subsystem. `Locked` is entered only when a new dependency fact arrives
//! for a job that is already running. Nothing leaves `Locked`, `Completed`
//! or `Failed`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Pending,
    InProgress,
    /// Superseded by a newer job for the same repository; consumers must not
    /// trust this job's result.
    Locked,
    Completed,
    Failed,
}

impl JobState {
    pub const ALL: [JobState; 5] = [
        JobState::Pending,
        JobState::InProgress,
        JobState::Locked,
        JobState::Completed,
        JobState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::InProgress => "in_progress",
            JobState::Locked => "locked",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Locked | JobState::Completed | JobState::Failed
        )
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::InProgress)
                | (JobState::InProgress, JobState::Locked)
                | (JobState::InProgress, JobState::Completed)
                | (JobState::InProgress, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = LifecycleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| LifecycleError::UnknownState(raw.to_string()))
    }
}

/// Errors raised by lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("job {name}: illegal state transition {from} -> {to}")]
    IllegalTransition {
        name: String,
        from: JobState,
        to: JobState,
    },

    /// `Locked` is reached only through `Job::supersede`.
    #[error("job {name}: locked is set only when a newer job supersedes it")]
    LockReserved { name: String },

    #[error("unknown job state: {0}")]
    UnknownState(String),
}
