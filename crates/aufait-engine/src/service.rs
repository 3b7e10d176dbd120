//! Job and repository service facades.
//!
//! Thin pass-throughs over the store traits: validate, write, then read
//! back the canonical stored form. `JobService` additionally hosts the
//! publish-hook entry point.

use aufait_store::{
    Job, JobId, JobStore, LifecycleError, PublishedEvent, Repository, RepositoryStore,
    RequestScope, StoreError, ValidationError,
};
use serde::Serialize;
use tracing::info;

use crate::reconcile::{
    AppliedJob, ApplyError, ReconcileError, ReconcilePlan, apply_plan, plan_for_event,
};
use crate::version::{SemverMatcher, VersionMatcher};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// No item of a bulk patch was applied. An empty batch counts.
    #[error("failed to update any of the {attempted} provided repositories")]
    BatchFailed {
        attempted: usize,
        failures: Vec<PatchFailure>,
    },
}

/// Jobs service: CRUD plus publish-hook reconciliation.
pub struct JobService<J, R, M = SemverMatcher> {
    jobs: J,
    repositories: R,
    matcher: M,
}

/// Result of handling one publish hook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookOutcome {
    pub plan: ReconcilePlan,
    pub applied: Vec<AppliedJob>,
}

impl<J, R> JobService<J, R, SemverMatcher>
where
    J: JobStore,
    R: RepositoryStore,
{
    pub fn new(jobs: J, repositories: R) -> Self {
        Self::with_matcher(jobs, repositories, SemverMatcher)
    }
}

impl<J, R, M> JobService<J, R, M>
where
    J: JobStore,
    R: RepositoryStore,
    M: VersionMatcher,
{
    pub fn with_matcher(jobs: J, repositories: R, matcher: M) -> Self {
        Self {
            jobs,
            repositories,
            matcher,
        }
    }

    pub fn get(&self, scope: &RequestScope, id: JobId) -> Result<Job, ServiceError> {
        Ok(self.jobs.get(scope, id)?)
    }

    pub fn get_by_name(&self, scope: &RequestScope, name: &str) -> Result<Job, ServiceError> {
        Ok(self.jobs.get_by_name(scope, name)?)
    }

    pub fn create(&self, scope: &RequestScope, job: Job) -> Result<Job, ServiceError> {
        job.validate()?;
        let id = self.jobs.create(scope, job)?;
        Ok(self.jobs.get(scope, id)?)
    }

    pub fn update(&self, scope: &RequestScope, id: JobId, job: Job) -> Result<Job, ServiceError> {
        job.validate()?;
        self.jobs.update(scope, id, job)?;
        Ok(self.jobs.get(scope, id)?)
    }

    /// Delete job `id`, returning what was removed.
    pub fn delete(&self, scope: &RequestScope, id: JobId) -> Result<Job, ServiceError> {
        let job = self.jobs.get(scope, id)?;
        self.jobs.delete(scope, id)?;
        Ok(job)
    }

    pub fn count(&self, scope: &RequestScope) -> Result<i64, ServiceError> {
        Ok(self.jobs.count(scope)?)
    }

    pub fn query(
        &self,
        scope: &RequestScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Job>, ServiceError> {
        Ok(self.jobs.query(scope, offset, limit)?)
    }

    /// Compute the job mutations implied by `event` without persisting them.
    pub fn create_jobs_from_dependency(
        &self,
        scope: &RequestScope,
        event: &PublishedEvent,
    ) -> Result<ReconcilePlan, ServiceError> {
        Ok(plan_for_event(
            scope,
            &self.jobs,
            &self.repositories,
            &self.matcher,
            event,
        )?)
    }

    /// Plan and persist the job mutations implied by `event`.
    pub fn handle_hook(
        &self,
        scope: &RequestScope,
        event: &PublishedEvent,
    ) -> Result<HookOutcome, ServiceError> {
        let plan = self.create_jobs_from_dependency(scope, event)?;
        let applied = apply_plan(scope, &self.jobs, &plan)?;
        info!(
            request_id = scope.request_id(),
            package = %event.name,
            version = %event.version,
            actions = plan.len(),
            jobs_written = applied.len(),
            "publish hook applied"
        );
        Ok(HookOutcome { plan, applied })
    }
}

/// One item of a bulk patch that was not applied.
#[derive(Debug)]
pub struct PatchFailure {
    pub name: String,
    pub error: StoreError,
}

/// Post-patch state of every named repository plus per-item failures.
#[derive(Debug)]
pub struct PatchOutcome {
    pub repositories: Vec<Repository>,
    pub failures: Vec<PatchFailure>,
}

/// Repositories service.
pub struct RepositoryService<R> {
    repositories: R,
}

impl<R: RepositoryStore> RepositoryService<R> {
    pub fn new(repositories: R) -> Self {
        Self { repositories }
    }

    pub fn get(&self, scope: &RequestScope, name: &str) -> Result<Repository, ServiceError> {
        Ok(self.repositories.get(scope, name)?)
    }

    pub fn create(
        &self,
        scope: &RequestScope,
        repository: Repository,
    ) -> Result<Repository, ServiceError> {
        repository.validate()?;
        let name = repository.name.clone();
        self.repositories.create(scope, repository)?;
        Ok(self.repositories.get(scope, &name)?)
    }

    pub fn update(
        &self,
        scope: &RequestScope,
        name: &str,
        repository: Repository,
    ) -> Result<Repository, ServiceError> {
        repository.validate()?;
        let new_name = repository.name.clone();
        self.repositories.update(scope, name, repository)?;
        Ok(self.repositories.get(scope, &new_name)?)
    }

    /// Bulk patch.
    ///
    /// Every item is validated before storage is touched. If no item is
    /// applied, an empty batch included, the call fails. Otherwise the
    /// post-patch state of all named repositories comes back with explicit
    /// per-item failures.
    pub fn patch(
        &self,
        scope: &RequestScope,
        repositories: Vec<Repository>,
    ) -> Result<PatchOutcome, ServiceError> {
        for repository in &repositories {
            repository.validate()?;
        }

        let results = self.repositories.patch(scope, &repositories);
        let failures: Vec<PatchFailure> = repositories
            .iter()
            .zip(results)
            .filter_map(|(repository, result)| {
                result.err().map(|error| PatchFailure {
                    name: repository.name.clone(),
                    error,
                })
            })
            .collect();

        if failures.len() == repositories.len() {
            return Err(ServiceError::BatchFailed {
                attempted: repositories.len(),
                failures,
            });
        }

        let names: Vec<String> = repositories
            .into_iter()
            .map(|repository| repository.name)
            .collect();
        Ok(PatchOutcome {
            repositories: self.repositories.query_by_name(scope, &names)?,
            failures,
        })
    }

    /// Delete repository `name`, returning what was removed.
    pub fn delete(&self, scope: &RequestScope, name: &str) -> Result<Repository, ServiceError> {
        let repository = self.repositories.get(scope, name)?;
        self.repositories.delete(scope, name)?;
        Ok(repository)
    }

    pub fn count(&self, scope: &RequestScope) -> Result<i64, ServiceError> {
        Ok(self.repositories.count(scope)?)
    }

    pub fn query(
        &self,
        scope: &RequestScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Repository>, ServiceError> {
        Ok(self.repositories.query(scope, offset, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aufait_store::{JobState, MemoryJobStore, MemoryRepositoryStore, PublishedDependency};

    fn scope() -> RequestScope {
        RequestScope::new("test").with_request_id("req-1")
    }

    #[test]
    fn create_validates_before_storage() {
        let jobs = MemoryJobStore::default();
        let repositories = MemoryRepositoryStore::default();
        let service = JobService::new(&jobs, &repositories);

        let err = service
            .create(&scope(), Job::new(""))
            .expect_err("blank job name must fail");
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(jobs.is_empty().expect("len"), "nothing persisted");
    }

    #[test]
    fn create_returns_canonical_stored_job() {
        let jobs = MemoryJobStore::default();
        let repositories = MemoryRepositoryStore::default();
        let service = JobService::new(&jobs, &repositories);

        let created = service
            .create(&scope(), Job::new("web-app"))
            .expect("create succeeds");
        assert_eq!(created.id, 1);
        assert_eq!(created.revision, 1);
    }

    #[test]
    fn delete_returns_removed_job() {
        let jobs = MemoryJobStore::default();
        let repositories = MemoryRepositoryStore::default();
        let service = JobService::new(&jobs, &repositories);
        let created = service
            .create(&scope(), Job::new("web-app"))
            .expect("create succeeds");

        let removed = service.delete(&scope(), created.id).expect("delete");
        assert_eq!(removed.name, "web-app");
        assert_eq!(service.count(&scope()).expect("count"), 0);
        assert!(matches!(
            service.delete(&scope(), created.id),
            Err(ServiceError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn handle_hook_left_pad_scenario() {
        let jobs = MemoryJobStore::default();
        let repositories = MemoryRepositoryStore::from_repositories(vec![
            Repository::new("left-pad").with_dependency("left-pad", "^1.0.0"),
        ]);
        let mut running = Job::new("left-pad");
        running
            .transition(JobState::InProgress)
            .expect("pending job can start");
        let running_id = jobs.create(&scope(), running).expect("seed running job");

        let service = JobService::new(&jobs, &repositories);
        let outcome = service
            .handle_hook(&scope(), &PublishedEvent::new("left-pad", "1.2.3"))
            .expect("hook succeeds");

        assert_eq!(outcome.plan.len(), 1);
        assert_eq!(outcome.plan.jobs().count(), 2);

        let old = jobs.get(&scope(), running_id).expect("old job kept");
        assert_eq!(old.state(), JobState::Locked);
        assert!(old.dependencies.is_empty());

        let current = service
            .get_by_name(&scope(), "left-pad")
            .expect("fork exists");
        assert_ne!(current.id, running_id);
        assert_eq!(current.state(), JobState::Pending);
        assert_eq!(
            current.dependencies,
            vec![PublishedDependency::new("left-pad", "1.2.3")]
        );
    }

    #[test]
    fn create_jobs_from_dependency_does_not_persist() {
        let jobs = MemoryJobStore::default();
        let repositories = MemoryRepositoryStore::from_repositories(vec![
            Repository::new("web-app").with_dependency("left-pad", "*"),
        ]);
        let service = JobService::new(&jobs, &repositories);

        let plan = service
            .create_jobs_from_dependency(&scope(), &PublishedEvent::new("left-pad", "1.0.0"))
            .expect("plan succeeds");
        assert_eq!(plan.len(), 1);
        assert!(jobs.is_empty().expect("len"));
    }

    #[test]
    fn custom_matcher_drives_filtering() {
        let jobs = MemoryJobStore::default();
        let repositories = MemoryRepositoryStore::from_repositories(vec![
            Repository::new("web-app").with_dependency("left-pad", "^9.0.0"),
        ]);
        let service =
            JobService::with_matcher(&jobs, &repositories, |_: &str, _: &str| true);

        let outcome = service
            .handle_hook(&scope(), &PublishedEvent::new("left-pad", "1.0.0"))
            .expect("hook succeeds");
        assert_eq!(outcome.applied.len(), 1);
    }

    #[test]
    fn patch_returns_state_and_per_item_failures() {
        let store = MemoryRepositoryStore::from_repositories(vec![
            Repository::new("web-app").with_dependency("left-pad", "^1.0.0"),
        ]);
        let service = RepositoryService::new(&store);

        let outcome = service
            .patch(
                &scope(),
                vec![
                    Repository::new("web-app").with_dependency("left-pad", "^2.0.0"),
                    Repository::new("ghost").with_dependency("left-pad", "*"),
                ],
            )
            .expect("partial success is not an error");

        assert_eq!(outcome.repositories.len(), 1);
        assert_eq!(
            outcome.repositories[0].constraint_for("left-pad"),
            Some("^2.0.0")
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].name, "ghost");
        assert!(outcome.failures[0].error.is_not_found());
    }

    #[test]
    fn patch_fails_when_every_item_fails() {
        let store = MemoryRepositoryStore::default();
        let service = RepositoryService::new(&store);

        let err = service
            .patch(&scope(), vec![Repository::new("ghost"), Repository::new("phantom")])
            .expect_err("all-failed batch is an error");
        match err {
            ServiceError::BatchFailed {
                attempted,
                failures,
            } => {
                assert_eq!(attempted, 2);
                assert_eq!(failures.len(), 2);
            }
            other => panic!("expected batch failure, got {other:?}"),
        }
    }

    #[test]
    fn patch_rejects_empty_batch() {
        let store = MemoryRepositoryStore::from_repositories(vec![Repository::new("web-app")]);
        let service = RepositoryService::new(&store);

        let err = service
            .patch(&scope(), Vec::new())
            .expect_err("nothing to apply is an error");
        assert!(matches!(
            err,
            ServiceError::BatchFailed { attempted: 0, .. }
        ));
    }

    #[test]
    fn patch_validates_every_item_first() {
        let store = MemoryRepositoryStore::from_repositories(vec![Repository::new("web-app")]);
        let service = RepositoryService::new(&store);

        let err = service
            .patch(
                &scope(),
                vec![
                    Repository::new("web-app").with_dependency("left-pad", "^2.0.0"),
                    Repository::new(""),
                ],
            )
            .expect_err("invalid item rejects the batch");
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(
            store
                .get(&scope(), "web-app")
                .expect("stored")
                .constraint_for("left-pad"),
            None,
            "valid item was not applied either"
        );
    }

    #[test]
    fn repository_update_round_trips() {
        let store = MemoryRepositoryStore::default();
        let service = RepositoryService::new(&store);
        service
            .create(&scope(), Repository::new("web-app"))
            .expect("create");

        let updated = service
            .update(
                &scope(),
                "web-app",
                Repository::new("web-app").with_dependency("lodash", "^4.0.0"),
            )
            .expect("update");
        assert_eq!(updated.constraint_for("lodash"), Some("^4.0.0"));
        assert_eq!(service.count(&scope()).expect("count"), 1);
        assert_eq!(service.query(&scope(), 0, 10).expect("query").len(), 1);
    }
}
