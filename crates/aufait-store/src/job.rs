//! Job type: one build/test run for a repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dependency::PublishedDependency;
use crate::lifecycle::{JobState, LifecycleError};
use crate::repository::Repository;
use crate::validation::{ValidationError, check_name};

/// Store-assigned numeric identity. `0` means "not persisted yet".
pub type JobId = u64;

/// A job: the unit of build/test work for one repository.
///
/// `name` is the repository's name. `state` is private so every change goes
/// through the lifecycle graph in [`JobState::can_transition_to`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    // ── Identity ──
    #[serde(default)]
    pub id: JobId,
    pub name: String,

    // ── Lifecycle ──
    #[serde(default)]
    state: JobState,

    // ── Dependency history (append-only) ──
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<PublishedDependency>,

    // ── Optimistic concurrency ──
    #[serde(default)]
    pub revision: u64,

    // ── Timestamps (stamped by the store) ──
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A fresh, unpersisted job in the default state. Timestamps stay at
    /// the epoch until a store stamps them.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            state: JobState::default(),
            dependencies: Vec::new(),
            revision: 0,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }

    /// A fresh job for `repository`, seeded with `dependencies`.
    pub fn from_repository(repository: &Repository, dependencies: Vec<PublishedDependency>) -> Self {
        let mut job = Self::new(repository.name.clone());
        job.dependencies = dependencies;
        job
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Whether the store has assigned an identity to this job.
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Append one dependency fact. Identity and state are untouched.
    pub fn record_dependency(&mut self, dependency: PublishedDependency) {
        self.dependencies.push(dependency);
    }

    /// Move along one edge of the lifecycle graph. `Locked` is refused here;
    /// use [`Job::supersede`].
    pub fn transition(&mut self, next: JobState) -> Result<(), LifecycleError> {
        if next == JobState::Locked {
            return Err(LifecycleError::LockReserved {
                name: self.name.clone(),
            });
        }
        self.apply_edge(next)
    }

    /// Mark a running job as superseded by a newer one.
    pub fn supersede(&mut self) -> Result<(), LifecycleError> {
        self.apply_edge(JobState::Locked)
    }

    fn apply_edge(&mut self, next: JobState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::IllegalTransition {
                name: self.name.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name("job", "name", &self.name)?;
        for dependency in &self.dependencies {
            dependency.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(name: &str) -> Job {
        let mut job = Job::new(name);
        job.transition(JobState::InProgress)
            .expect("pending job can start");
        job
    }

    #[test]
    fn from_repository_seeds_dependencies_in_default_state() {
        let repo = Repository::new("web-app").with_dependency("left-pad", "^1.0.0");
        let job = Job::from_repository(&repo, vec![PublishedDependency::new("left-pad", "1.2.3")]);

        assert_eq!(job.name, "web-app");
        assert_eq!(job.state(), JobState::Pending);
        assert_eq!(job.dependencies.len(), 1);
        assert!(!job.is_persisted());
    }

    #[test]
    fn supersede_locks_running_job_and_keeps_dependencies() {
        let mut job = running("web-app");
        job.record_dependency(PublishedDependency::new("left-pad", "1.0.0"));

        job.supersede().expect("running job can be superseded");
        assert_eq!(job.state(), JobState::Locked);
        assert_eq!(job.dependencies, vec![PublishedDependency::new("left-pad", "1.0.0")]);
    }

    #[test]
    fn supersede_rejects_idle_job() {
        let mut job = Job::new("web-app");
        let err = job.supersede().expect_err("pending job must not lock");
        assert_eq!(
            err,
            LifecycleError::IllegalTransition {
                name: "web-app".to_string(),
                from: JobState::Pending,
                to: JobState::Locked,
            }
        );
        assert_eq!(job.state(), JobState::Pending);
    }

    #[test]
    fn locked_job_cannot_be_restarted() {
        let mut job = running("web-app");
        job.supersede().expect("running job can be superseded");
        assert!(job.transition(JobState::InProgress).is_err());
        assert!(job.transition(JobState::Completed).is_err());
    }

    #[test]
    fn transition_refuses_to_lock_running_job() {
        let mut job = running("web-app");
        let err = job
            .transition(JobState::Locked)
            .expect_err("locking goes through supersede");
        assert_eq!(
            err,
            LifecycleError::LockReserved {
                name: "web-app".to_string()
            }
        );
        assert_eq!(job.state(), JobState::InProgress);
    }

    #[test]
    fn job_parses_with_defaults() {
        let raw = r#"{"name":"web-app"}"#;
        let job: Job = serde_json::from_str(raw).expect("minimal job parses");
        assert_eq!(job.id, 0);
        assert_eq!(job.state(), JobState::Pending);
        assert!(job.dependencies.is_empty());
    }

    #[test]
    fn missing_timestamps_parse_to_a_stable_value() {
        let raw = r#"{"id":3,"name":"web-app"}"#;
        let first: Job = serde_json::from_str(raw).expect("minimal job parses");
        let reencoded = serde_json::to_string(&first).expect("job serializes");
        let second: Job = serde_json::from_str(&reencoded).expect("job reparses");

        assert_eq!(first.updated_at, DateTime::<Utc>::default());
        assert_eq!(second, first);
    }

    #[test]
    fn job_state_serializes_snake_case() {
        let job = running("web-app");
        let value = serde_json::to_value(&job).expect("job serializes");
        assert_eq!(value["state"], "in_progress");
    }
}
