//! Lock-scoped atomic mutation of a JSONL-backed store.
//!
//! Two processes handling publish events for the same store serialize on
//! `<path>.lock`: the whole load → mutate → save cycle runs while the lock
//! file exists, so "read job → decide → write job(s)" cannot interleave.

use chrono::Utc;
use std::error::Error as StdError;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::memory::{MemoryJobStore, MemoryRepositoryStore};

/// A store that can be hydrated from and flushed to a JSONL file.
pub trait JsonlSnapshot: Sized + Default {
    fn load_jsonl(path: &Path) -> Result<Self, StoreError>;
    fn save_jsonl(&self, path: &Path) -> Result<(), StoreError>;
}

impl JsonlSnapshot for MemoryJobStore {
    fn load_jsonl(path: &Path) -> Result<Self, StoreError> {
        MemoryJobStore::load_jsonl(path)
    }

    fn save_jsonl(&self, path: &Path) -> Result<(), StoreError> {
        MemoryJobStore::save_jsonl(self, path)
    }
}

impl JsonlSnapshot for MemoryRepositoryStore {
    fn load_jsonl(path: &Path) -> Result<Self, StoreError> {
        MemoryRepositoryStore::load_jsonl(path)
    }

    fn save_jsonl(&self, path: &Path) -> Result<(), StoreError> {
        MemoryRepositoryStore::save_jsonl(self, path)
    }
}

pub fn lock_path_for(store_path: &Path) -> PathBuf {
    let mut path: OsString = store_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

#[derive(Debug)]
pub enum AtomicMutationError<E> {
    LockBusy { lock_path: String },
    LockIo { lock_path: String, message: String },
    Store(StoreError),
    Mutation(E),
}

impl<E: Display> Display for AtomicMutationError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockBusy { lock_path } => write!(f, "store lock busy: {lock_path}"),
            Self::LockIo { lock_path, message } => {
                write!(f, "failed to acquire store lock {lock_path}: {message}")
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Mutation(err) => write!(f, "{err}"),
        }
    }
}

impl<E> StdError for AtomicMutationError<E>
where
    E: Display + std::fmt::Debug + StdError + 'static,
{
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Mutation(err) => Some(err),
            Self::LockBusy { .. } | Self::LockIo { .. } => None,
        }
    }
}

/// Execute one lock-scoped mutation against a JSONL store file.
///
/// A missing file starts from an empty store. The mutator returns
/// `(value, changed)`; `changed=true` persists the store before the lock
/// is released.
pub fn mutate_jsonl<S, T, E, F>(
    path: impl AsRef<Path>,
    mutator: F,
) -> Result<T, AtomicMutationError<E>>
where
    S: JsonlSnapshot,
    F: FnOnce(&mut S) -> Result<(T, bool), E>,
{
    let path = path.as_ref();
    let _guard = StoreFileLockGuard::acquire(path)?;

    let mut store = if path.exists() {
        S::load_jsonl(path).map_err(AtomicMutationError::Store)?
    } else {
        S::default()
    };
    let (value, changed) = mutator(&mut store).map_err(AtomicMutationError::Mutation)?;
    if changed {
        store.save_jsonl(path).map_err(AtomicMutationError::Store)?;
    }
    Ok(value)
}

struct StoreFileLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl StoreFileLockGuard {
    fn acquire<E>(path: &Path) -> Result<Self, AtomicMutationError<E>> {
        let lock_path = lock_path_for(path);
        let lock_io = |message: String| AtomicMutationError::LockIo {
            lock_path: lock_path.display().to_string(),
            message,
        };

        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| lock_io(e.to_string()))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AtomicMutationError::LockBusy {
                    lock_path: lock_path.display().to_string(),
                })
            }
            Err(err) => Err(lock_io(err.to_string())),
        }
    }
}

impl Drop for StoreFileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
