//! Capability traits the reconciliation engine depends on.
//!
//! Engines and services only see these traits, never a concrete backend.
//! `MemoryJobStore` / `MemoryRepositoryStore` are the in-tree implementations.

use crate::error::StoreError;
use crate::job::{Job, JobId};
use crate::repository::Repository;
use crate::scope::RequestScope;

/// Job persistence contract.
pub trait JobStore {
    /// Lookup one job by identity.
    fn get(&self, scope: &RequestScope, id: JobId) -> Result<Job, StoreError>;

    /// Lookup the current (newest) job carrying `name`.
    fn get_by_name(&self, scope: &RequestScope, name: &str) -> Result<Job, StoreError>;

    fn count(&self, scope: &RequestScope) -> Result<i64, StoreError>;

    /// Jobs in identity order, skipping `offset` and returning at most `limit`.
    fn query(
        &self,
        scope: &RequestScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Job>, StoreError>;

    /// Persist a new job and return its assigned identity.
    fn create(&self, scope: &RequestScope, job: Job) -> Result<JobId, StoreError>;

    /// Replace job `id`. `job.revision` must equal the stored revision.
    fn update(&self, scope: &RequestScope, id: JobId, job: Job) -> Result<(), StoreError>;

    fn delete(&self, scope: &RequestScope, id: JobId) -> Result<(), StoreError>;

    /// `get_by_name` with "not found" lifted into `None`.
    ///
    /// Every other error is still an error.
    fn find_by_name(&self, scope: &RequestScope, name: &str) -> Result<Option<Job>, StoreError> {
        match self.get_by_name(scope, name) {
            Ok(job) => Ok(Some(job)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Repository persistence contract.
pub trait RepositoryStore {
    fn get(&self, scope: &RequestScope, name: &str) -> Result<Repository, StoreError>;

    fn count(&self, scope: &RequestScope) -> Result<i64, StoreError>;

    fn query(
        &self,
        scope: &RequestScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Repository>, StoreError>;

    fn create(&self, scope: &RequestScope, repository: Repository) -> Result<(), StoreError>;

    fn update(
        &self,
        scope: &RequestScope,
        name: &str,
        repository: Repository,
    ) -> Result<(), StoreError>;

    fn delete(&self, scope: &RequestScope, name: &str) -> Result<(), StoreError>;

    /// Repositories declaring any constraint on `package`.
    fn query_by_dependency(
        &self,
        scope: &RequestScope,
        package: &str,
    ) -> Result<Vec<Repository>, StoreError>;

    /// Repositories named in `names`, in input order; unknown names are skipped.
    fn query_by_name(
        &self,
        scope: &RequestScope,
        names: &[String],
    ) -> Result<Vec<Repository>, StoreError>;

    /// Bulk patch: one result slot per input item, `Ok` for success.
    fn patch(
        &self,
        scope: &RequestScope,
        repositories: &[Repository],
    ) -> Vec<Result<(), StoreError>>;
}

impl<T: JobStore + ?Sized> JobStore for &T {
    fn get(&self, scope: &RequestScope, id: JobId) -> Result<Job, StoreError> {
        (**self).get(scope, id)
    }

    fn get_by_name(&self, scope: &RequestScope, name: &str) -> Result<Job, StoreError> {
        (**self).get_by_name(scope, name)
    }

    fn count(&self, scope: &RequestScope) -> Result<i64, StoreError> {
        (**self).count(scope)
    }

    fn query(
        &self,
        scope: &RequestScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Job>, StoreError> {
        (**self).query(scope, offset, limit)
    }

    fn create(&self, scope: &RequestScope, job: Job) -> Result<JobId, StoreError> {
        (**self).create(scope, job)
    }

    fn update(&self, scope: &RequestScope, id: JobId, job: Job) -> Result<(), StoreError> {
        (**self).update(scope, id, job)
    }

    fn delete(&self, scope: &RequestScope, id: JobId) -> Result<(), StoreError> {
        (**self).delete(scope, id)
    }

    fn find_by_name(&self, scope: &RequestScope, name: &str) -> Result<Option<Job>, StoreError> {
        (**self).find_by_name(scope, name)
    }
}

impl<T: RepositoryStore + ?Sized> RepositoryStore for &T {
    fn get(&self, scope: &RequestScope, name: &str) -> Result<Repository, StoreError> {
        (**self).get(scope, name)
    }

    fn count(&self, scope: &RequestScope) -> Result<i64, StoreError> {
        (**self).count(scope)
    }

    fn query(
        &self,
        scope: &RequestScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Repository>, StoreError> {
        (**self).query(scope, offset, limit)
    }

    fn create(&self, scope: &RequestScope, repository: Repository) -> Result<(), StoreError> {
        (**self).create(scope, repository)
    }

    fn update(
        &self,
        scope: &RequestScope,
        name: &str,
        repository: Repository,
    ) -> Result<(), StoreError> {
        (**self).update(scope, name, repository)
    }

    fn delete(&self, scope: &RequestScope, name: &str) -> Result<(), StoreError> {
        (**self).delete(scope, name)
    }

    fn query_by_dependency(
        &self,
        scope: &RequestScope,
        package: &str,
    ) -> Result<Vec<Repository>, StoreError> {
        (**self).query_by_dependency(scope, package)
    }

    fn query_by_name(
        &self,
        scope: &RequestScope,
        names: &[String],
    ) -> Result<Vec<Repository>, StoreError> {
        (**self).query_by_name(scope, names)
    }

    fn patch(
        &self,
        scope: &RequestScope,
        repositories: &[Repository],
    ) -> Vec<Result<(), StoreError>> {
        (**self).patch(scope, repositories)
    }
}
