use aufait_store::{Job, MemoryJobStore, MemoryRepositoryStore, Repository};
use serde_json::{Value, json};
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the stderr log subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn exit_with_error(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

/// Load a jobs file for reading; a missing file is an empty store.
pub fn load_jobs_or_exit(path: &Path) -> MemoryJobStore {
    if !path.exists() {
        return MemoryJobStore::default();
    }
    MemoryJobStore::load_jsonl(path)
        .unwrap_or_else(|e| exit_with_error(format!("failed to load {}: {e}", path.display())))
}

/// Load a repositories file for reading; a missing file is an empty store.
pub fn load_repositories_or_exit(path: &Path) -> MemoryRepositoryStore {
    if !path.exists() {
        return MemoryRepositoryStore::default();
    }
    MemoryRepositoryStore::load_jsonl(path)
        .unwrap_or_else(|e| exit_with_error(format!("failed to load {}: {e}", path.display())))
}

pub fn job_json(job: &Job) -> Value {
    json!({
        "id": job.id,
        "name": job.name,
        "state": job.state().as_str(),
        "revision": job.revision,
        "dependencies": job.dependencies,
        "createdAt": job.created_at.to_rfc3339(),
        "updatedAt": job.updated_at.to_rfc3339()
    })
}

pub fn job_line(job: &Job) -> String {
    let latest = job
        .dependencies
        .last()
        .map(|dep| format!("{}@{}", dep.name, dep.version))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "#{} {} [{}] deps={} latest={}",
        job.id,
        job.name,
        job.state(),
        job.dependencies.len(),
        latest
    )
}

pub fn repository_json(repository: &Repository) -> Value {
    json!({
        "name": repository.name,
        "dependencies": repository.dependencies
    })
}

pub fn repository_line(repository: &Repository) -> String {
    let deps = repository
        .dependencies
        .iter()
        .map(|(package, constraint)| format!("{package}={constraint}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} ({deps})", repository.name)
}
