//! # aufait-store
//!
//! Memory layer for job/repository state.
//!
//! This crate provides:
//! - `Job`, `Repository`, `PublishedDependency` and `PublishedEvent` types
//! - the job lifecycle state machine (`JobState`)
//! - `JobStore` / `RepositoryStore` capability traits
//! - in-memory stores plus JSONL read/write (portable persistence)
//! - lock-scoped atomic mutation of a JSONL-backed store
//!
//! It intentionally does not decide which jobs a publish event affects.
//! That logic lives in `aufait-engine`.
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per record)
//!     <->  load / save (under <path>.lock)
//! MemoryJobStore / MemoryRepositoryStore
//!     <->  JobStore / RepositoryStore traits
//! ```

pub mod atomic_store;
pub mod contract;
pub mod dependency;
pub mod error;
pub mod hook;
pub mod job;
pub mod jsonl;
pub mod lifecycle;
pub mod memory;
pub mod repository;
pub mod scope;
pub mod validation;

pub use atomic_store::{AtomicMutationError, JsonlSnapshot, lock_path_for, mutate_jsonl};
pub use contract::{JobStore, RepositoryStore};
pub use dependency::PublishedDependency;
pub use error::{RecordKind, StoreError};
pub use hook::PublishedEvent;
pub use job::{Job, JobId};
pub use jsonl::{JsonlError, read_records, read_records_from_path, write_records, write_records_to_path};
pub use lifecycle::{JobState, LifecycleError};
pub use memory::{MemoryJobStore, MemoryRepositoryStore};
pub use repository::Repository;
pub use scope::RequestScope;
pub use validation::ValidationError;
