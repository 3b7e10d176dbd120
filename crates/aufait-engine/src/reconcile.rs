//! Dependency-event reconciliation.
//!
//! One publish event becomes one [`JobAction`] per affected repository:
//!
//! | current job for the repository | action                                   |
//! |--------------------------------|------------------------------------------|
//! | none                           | `Create`: new job seeded with the fact   |
//! | `InProgress`                   | `LockAndFork`: lock it, new seeded job   |
//! | any other state                | `Merge`: append the fact                 |
//!
//! Planning reads stores only. [`apply_plan`] performs the writes.

use aufait_store::{
    Job, JobState, JobStore, LifecycleError, PublishedDependency, PublishedEvent, Repository,
    RepositoryStore, RequestScope, StoreError, ValidationError,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::version::{VersionMatcher, filter_by_version};

/// The mutation decided for one affected repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum JobAction {
    /// No job existed: a new one carrying only the new fact.
    Create { job: Job },
    /// An idle job absorbed the new fact.
    Merge { job: Job },
    /// A running job was superseded; `fork` carries only the new fact.
    LockAndFork { locked: Job, fork: Job },
}

impl JobAction {
    pub fn kind(&self) -> &'static str {
        match self {
            JobAction::Create { .. } => "create",
            JobAction::Merge { .. } => "merge",
            JobAction::LockAndFork { .. } => "lock_and_fork",
        }
    }

    pub fn repository(&self) -> &str {
        match self {
            JobAction::Create { job } | JobAction::Merge { job } => &job.name,
            JobAction::LockAndFork { fork, .. } => &fork.name,
        }
    }

    /// Jobs touched by this action. `LockAndFork` yields the locked job first.
    pub fn jobs(&self) -> Vec<&Job> {
        match self {
            JobAction::Create { job } | JobAction::Merge { job } => vec![job],
            JobAction::LockAndFork { locked, fork } => vec![locked, fork],
        }
    }
}

/// Every action implied by one publish event, in filter order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcilePlan {
    pub event: PublishedEvent,
    pub actions: Vec<JobAction>,
}

impl ReconcilePlan {
    pub fn new(event: PublishedEvent) -> Self {
        Self {
            event,
            actions: Vec::new(),
        }
    }

    /// The desired post-event jobs, flattened in action order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.actions.iter().flat_map(JobAction::jobs)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("invalid publish event: {0}")]
    InvalidEvent(#[from] ValidationError),

    #[error("failed to query repositories depending on {package}: {source}")]
    RepositoryLookup {
        package: String,
        #[source]
        source: StoreError,
    },

    /// `decided` holds the actions for the repositories processed before
    /// `repository`; nothing after it was looked at.
    #[error("job lookup failed for repository {repository}: {source}")]
    JobLookup {
        repository: String,
        #[source]
        source: StoreError,
        decided: ReconcilePlan,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Decide the action for one repository given its current job, if any.
///
/// A job whose name does not match the repository is treated as absent.
pub fn decide(
    repository: &Repository,
    current: Option<Job>,
    fact: PublishedDependency,
) -> Result<JobAction, LifecycleError> {
    let current = current.filter(|job| {
        let matches = job.name == repository.name;
        if !matches {
            debug!(
                repository = %repository.name,
                job = %job.name,
                "job lookup returned a different repository's job"
            );
        }
        matches
    });

    match current {
        None => Ok(JobAction::Create {
            job: Job::from_repository(repository, vec![fact]),
        }),
        Some(mut locked) if locked.state() == JobState::InProgress => {
            locked.supersede()?;
            Ok(JobAction::LockAndFork {
                locked,
                fork: Job::from_repository(repository, vec![fact]),
            })
        }
        Some(mut job) => {
            job.record_dependency(fact);
            Ok(JobAction::Merge { job })
        }
    }
}

/// Turn one publish event into a plan. Reads only; nothing is written.
///
/// Fail-fast: the first store error aborts the batch. See
/// [`ReconcileError::JobLookup`] for what survives.
pub fn plan_for_event<J, R, M>(
    scope: &RequestScope,
    jobs: &J,
    repositories: &R,
    matcher: &M,
    event: &PublishedEvent,
) -> Result<ReconcilePlan, ReconcileError>
where
    J: JobStore + ?Sized,
    R: RepositoryStore + ?Sized,
    M: VersionMatcher + ?Sized,
{
    event.validate()?;

    let candidates = repositories
        .query_by_dependency(scope, &event.name)
        .map_err(|source| ReconcileError::RepositoryLookup {
            package: event.name.clone(),
            source,
        })?;
    let candidate_count = candidates.len();
    let affected = filter_by_version(candidates, event, matcher);
    info!(
        request_id = scope.request_id(),
        package = %event.name,
        version = %event.version,
        candidates = candidate_count,
        affected = affected.len(),
        "reconciling publish event"
    );

    let mut plan = ReconcilePlan::new(event.clone());
    for repository in &affected {
        let current = match jobs.find_by_name(scope, &repository.name) {
            Ok(current) => current,
            Err(source) => {
                warn!(
                    request_id = scope.request_id(),
                    repository = %repository.name,
                    decided = plan.len(),
                    error = %source,
                    "job lookup failed; aborting reconciliation"
                );
                return Err(ReconcileError::JobLookup {
                    repository: repository.name.clone(),
                    source,
                    decided: plan,
                });
            }
        };

        let action = decide(repository, current, event.to_dependency())?;
        debug!(
            repository = %repository.name,
            action = action.kind(),
            "decided job action"
        );
        plan.actions.push(action);
    }

    Ok(plan)
}

/// One persisted job and the action that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedJob {
    pub action: &'static str,
    pub job: Job,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to apply {action} for repository {repository} (action {index}): {source}")]
pub struct ApplyError {
    pub index: usize,
    pub action: &'static str,
    pub repository: String,
    #[source]
    pub source: StoreError,
    /// Jobs persisted before the failure.
    pub applied: Vec<AppliedJob>,
}

/// Persist a plan through the job store, in action order.
///
/// `LockAndFork` writes the lock before creating the fork. Updates are
/// revision-checked, so a job that changed since planning fails with
/// `StoreError::Conflict`. Returns the canonical stored form of every job
/// written.
pub fn apply_plan<J>(
    scope: &RequestScope,
    jobs: &J,
    plan: &ReconcilePlan,
) -> Result<Vec<AppliedJob>, ApplyError>
where
    J: JobStore + ?Sized,
{
    let mut applied = Vec::new();
    for (index, action) in plan.actions.iter().enumerate() {
        let result = apply_action(scope, jobs, action, &mut applied);
        if let Err(source) = result {
            warn!(
                request_id = scope.request_id(),
                repository = action.repository(),
                action = action.kind(),
                error = %source,
                "failed to persist job action"
            );
            return Err(ApplyError {
                index,
                action: action.kind(),
                repository: action.repository().to_string(),
                source,
                applied,
            });
        }
    }
    Ok(applied)
}

fn apply_action<J>(
    scope: &RequestScope,
    jobs: &J,
    action: &JobAction,
    applied: &mut Vec<AppliedJob>,
) -> Result<(), StoreError>
where
    J: JobStore + ?Sized,
{
    let kind = action.kind();
    match action {
        JobAction::Create { job } => {
            let id = jobs.create(scope, job.clone())?;
            applied.push(AppliedJob {
                action: kind,
                job: jobs.get(scope, id)?,
            });
        }
        JobAction::Merge { job } => {
            jobs.update(scope, job.id, job.clone())?;
            applied.push(AppliedJob {
                action: kind,
                job: jobs.get(scope, job.id)?,
            });
        }
        JobAction::LockAndFork { locked, fork } => {
            jobs.update(scope, locked.id, locked.clone())?;
            applied.push(AppliedJob {
                action: kind,
                job: jobs.get(scope, locked.id)?,
            });
            let id = jobs.create(scope, fork.clone())?;
            applied.push(AppliedJob {
                action: kind,
                job: jobs.get(scope, id)?,
            });
        }
    }
    Ok(())
}
