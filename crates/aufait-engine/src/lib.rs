//! # aufait-engine
//!
//! Dependency-event reconciliation: turn one package-publish event into the
//! set of job mutations it implies.
//!
//! ```text
//! PublishedEvent
//!     -> RepositoryStore::query_by_dependency
//!     -> filter_by_version (VersionMatcher)
//!     -> JobStore::find_by_name + decide   (plan_for_event)
//!     -> JobStore::update / create         (apply_plan)
//! ```
//!
//! The engine depends only on the `aufait-store` traits and never on a
//! concrete backend.

pub mod reconcile;
pub mod service;
pub mod version;

pub use reconcile::{
    AppliedJob, ApplyError, JobAction, ReconcileError, ReconcilePlan, apply_plan, decide,
    plan_for_event,
};
pub use service::{
    HookOutcome, JobService, PatchFailure, PatchOutcome, RepositoryService, ServiceError,
};
pub use version::{SemverMatcher, VersionMatcher, filter_by_version};
