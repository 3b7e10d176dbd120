//! Canonical in-memory job and repository stores.
//!
//! These are the in-tree `JobStore` / `RepositoryStore` implementations:
//! - deterministic iteration order (job id, repository name)
//! - optimistic concurrency on job updates (`revision`)
//! - JSONL load/save for the CLI and tests

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::contract::{JobStore, RepositoryStore};
use crate::error::{RecordKind, StoreError};
use crate::job::{Job, JobId};
use crate::jsonl::{read_records_from_path, write_records_to_path};
use crate::lifecycle::JobState;
use crate::repository::Repository;
use crate::scope::RequestScope;

#[derive(Debug, Default)]
struct JobTable {
    jobs: BTreeMap<JobId, Job>,
    next_id: JobId,
}

impl JobTable {
    fn allocate_id(&mut self) -> Result<JobId, StoreError> {
        let id = self.next_id.max(1);
        self.next_id = successor(id)?;
        Ok(id)
    }

    /// Keep `next_id` past an id that arrived from outside the allocator.
    fn reserve(&mut self, id: JobId) -> Result<(), StoreError> {
        self.next_id = self.next_id.max(successor(id)?);
        Ok(())
    }
}

fn successor(id: JobId) -> Result<JobId, StoreError> {
    id.checked_add(1)
        .ok_or_else(|| StoreError::Backend(format!("job id space exhausted at {id}")))
}

/// In-memory job store.
///
/// At most one non-`Locked` job may carry a given name; `get_by_name`
/// returns the newest job for the name.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    table: RwLock<JobTable>,
}

impl MemoryJobStore {
    /// Build a store from fully-materialized jobs.
    ///
    /// Jobs without an identity are assigned one after the highest existing
    /// id. Duplicate ids resolve last-write-wins. Fails when an id leaves
    /// no room for the allocator.
    pub fn from_jobs(jobs: Vec<Job>) -> Result<Self, StoreError> {
        let mut table = JobTable::default();
        let mut unassigned = Vec::new();
        for job in jobs {
            if job.is_persisted() {
                table.reserve(job.id)?;
                table.jobs.insert(job.id, job);
            } else {
                unassigned.push(job);
            }
        }
        for mut job in unassigned {
            job.id = table.allocate_id()?;
            table.jobs.insert(job.id, job);
        }
        Ok(Self {
            table: RwLock::new(table),
        })
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let jobs: Vec<Job> = read_records_from_path(path)?;
        Self::from_jobs(jobs)
    }

    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let jobs = self.snapshot()?;
        write_records_to_path(path, &jobs)?;
        Ok(())
    }

    /// All jobs in id order.
    pub fn snapshot(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.read()?.jobs.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.jobs.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, JobTable>, StoreError> {
        self.table
            .read()
            .map_err(|_| StoreError::Backend("job table lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, JobTable>, StoreError> {
        self.table
            .write()
            .map_err(|_| StoreError::Backend("job table lock poisoned".to_string()))
    }
}

impl JobStore for MemoryJobStore {
    fn get(&self, _scope: &RequestScope, id: JobId) -> Result<Job, StoreError> {
        self.read()?
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::Job, id))
    }

    fn get_by_name(&self, _scope: &RequestScope, name: &str) -> Result<Job, StoreError> {
        self.read()?
            .jobs
            .values()
            .rev()
            .find(|job| job.name == name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::Job, name))
    }

    fn count(&self, _scope: &RequestScope) -> Result<i64, StoreError> {
        Ok(self.read()?.jobs.len() as i64)
    }

    fn query(
        &self,
        _scope: &RequestScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .read()?
            .jobs
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn create(&self, scope: &RequestScope, mut job: Job) -> Result<JobId, StoreError> {
        let mut table = self.write()?;
        if job.is_persisted() && table.jobs.contains_key(&job.id) {
            return Err(StoreError::already_exists(RecordKind::Job, job.id));
        }
        if table
            .jobs
            .values()
            .any(|existing| existing.name == job.name && existing.state() != JobState::Locked)
        {
            return Err(StoreError::already_exists(RecordKind::Job, &job.name));
        }

        job.id = if job.is_persisted() {
            table.reserve(job.id)?;
            job.id
        } else {
            table.allocate_id()?
        };
        job.revision = 1;
        job.created_at = scope.now();
        job.updated_at = scope.now();
        let id = job.id;
        table.jobs.insert(id, job);
        Ok(id)
    }

    fn update(&self, scope: &RequestScope, id: JobId, mut job: Job) -> Result<(), StoreError> {
        let mut table = self.write()?;
        let current = table
            .jobs
            .get(&id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Job, id))?;
        if current.revision != job.revision {
            return Err(StoreError::Conflict {
                kind: RecordKind::Job,
                key: id.to_string(),
                expected: job.revision,
                actual: current.revision,
            });
        }

        job.id = id;
        job.revision = current.revision + 1;
        job.created_at = current.created_at;
        job.updated_at = scope.now();
        table.jobs.insert(id, job);
        Ok(())
    }

    fn delete(&self, _scope: &RequestScope, id: JobId) -> Result<(), StoreError> {
        self.write()?
            .jobs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(RecordKind::Job, id))
    }
}

/// In-memory repository store keyed by repository name.
#[derive(Debug, Default)]
pub struct MemoryRepositoryStore {
    repositories: RwLock<BTreeMap<String, Repository>>,
}

impl MemoryRepositoryStore {
    /// Duplicate names resolve last-write-wins.
    pub fn from_repositories(repositories: Vec<Repository>) -> Self {
        let index = repositories
            .into_iter()
            .map(|repository| (repository.name.clone(), repository))
            .collect();
        Self {
            repositories: RwLock::new(index),
        }
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let repositories: Vec<Repository> = read_records_from_path(path)?;
        Ok(Self::from_repositories(repositories))
    }

    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let repositories = self.snapshot()?;
        write_records_to_path(path, &repositories)?;
        Ok(())
    }

    /// All repositories in name order.
    pub fn snapshot(&self) -> Result<Vec<Repository>, StoreError> {
        Ok(self.read()?.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Repository>>, StoreError> {
        self.repositories
            .read()
            .map_err(|_| StoreError::Backend("repository index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Repository>>, StoreError> {
        self.repositories
            .write()
            .map_err(|_| StoreError::Backend("repository index lock poisoned".to_string()))
    }
}

impl RepositoryStore for MemoryRepositoryStore {
    fn get(&self, _scope: &RequestScope, name: &str) -> Result<Repository, StoreError> {
        self.read()?
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::Repository, name))
    }

    fn count(&self, _scope: &RequestScope) -> Result<i64, StoreError> {
        Ok(self.read()?.len() as i64)
    }

    fn query(
        &self,
        _scope: &RequestScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Repository>, StoreError> {
        Ok(self
            .read()?
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn create(&self, _scope: &RequestScope, repository: Repository) -> Result<(), StoreError> {
        let mut index = self.write()?;
        if index.contains_key(&repository.name) {
            return Err(StoreError::already_exists(
                RecordKind::Repository,
                &repository.name,
            ));
        }
        index.insert(repository.name.clone(), repository);
        Ok(())
    }

    fn update(
        &self,
        _scope: &RequestScope,
        name: &str,
        repository: Repository,
    ) -> Result<(), StoreError> {
        let mut index = self.write()?;
        if !index.contains_key(name) {
            return Err(StoreError::not_found(RecordKind::Repository, name));
        }
        if repository.name != name && index.contains_key(&repository.name) {
            return Err(StoreError::already_exists(
                RecordKind::Repository,
                &repository.name,
            ));
        }
        index.remove(name);
        index.insert(repository.name.clone(), repository);
        Ok(())
    }

    fn delete(&self, _scope: &RequestScope, name: &str) -> Result<(), StoreError> {
        self.write()?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(RecordKind::Repository, name))
    }

    fn query_by_dependency(
        &self,
        _scope: &RequestScope,
        package: &str,
    ) -> Result<Vec<Repository>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|repository| repository.depends_on(package))
            .cloned()
            .collect())
    }

    fn query_by_name(
        &self,
        _scope: &RequestScope,
        names: &[String],
    ) -> Result<Vec<Repository>, StoreError> {
        let index = self.read()?;
        Ok(names
            .iter()
            .filter_map(|name| index.get(name).cloned())
            .collect())
    }

    fn patch(
        &self,
        _scope: &RequestScope,
        repositories: &[Repository],
    ) -> Vec<Result<(), StoreError>> {
        let mut index = match self.write() {
            Ok(index) => index,
            Err(_) => {
                return repositories
                    .iter()
                    .map(|_| {
                        Err(StoreError::Backend(
                            "repository index lock poisoned".to_string(),
                        ))
                    })
                    .collect();
            }
        };

        repositories
            .iter()
            .map(|patch| match index.get_mut(&patch.name) {
                Some(stored) => {
                    stored.merge_constraints(patch);
                    Ok(())
                }
                None => Err(StoreError::not_found(RecordKind::Repository, &patch.name)),
            })
            .collect()
    }
}
