use aufait_engine::{JobService, ServiceError};
use aufait_store::{JobState, MemoryJobStore, MemoryRepositoryStore, RequestScope, mutate_jsonl};
use serde_json::json;

use crate::cli::{JobCommands, JobStateArg};
use crate::config::Settings;
use crate::support::{exit_with_error, job_json, job_line, load_jobs_or_exit, print_json};

pub fn run(settings: &Settings, command: JobCommands) {
    let scope = RequestScope::new("cli");
    match command {
        JobCommands::List {
            offset,
            limit,
            json,
        } => run_list(settings, &scope, offset, limit, json),
        JobCommands::Get { id, json } => run_get(settings, &scope, id, json),
        JobCommands::Count { json } => run_count(settings, &scope, json),
        JobCommands::Delete { id, json } => run_delete(settings, &scope, id, json),
        JobCommands::Transition { id, state, json } => {
            run_transition(settings, &scope, id, map_state(state), json)
        }
    }
}

fn map_state(arg: JobStateArg) -> JobState {
    match arg {
        JobStateArg::InProgress => JobState::InProgress,
        JobStateArg::Completed => JobState::Completed,
        JobStateArg::Failed => JobState::Failed,
    }
}

fn run_list(settings: &Settings, scope: &RequestScope, offset: usize, limit: usize, json: bool) {
    let jobs = load_jobs_or_exit(&settings.jobs);
    let repositories = MemoryRepositoryStore::default();
    let service = JobService::new(&jobs, &repositories);
    let rows = service
        .query(scope, offset, limit)
        .unwrap_or_else(|e| exit_with_error(e));
    let total = service.count(scope).unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({
            "action": "job.list",
            "jobsPath": settings.jobs.display().to_string(),
            "total": total,
            "offset": offset,
            "items": rows.iter().map(job_json).collect::<Vec<_>>()
        }));
    } else {
        let mut lines = vec![format!("aufait job list ({} of {total})", rows.len())];
        lines.extend(rows.iter().map(|job| format!("  {}", job_line(job))));
        println!("{}", lines.join("\n"));
    }
}

fn run_get(settings: &Settings, scope: &RequestScope, id: u64, json: bool) {
    let jobs = load_jobs_or_exit(&settings.jobs);
    let repositories = MemoryRepositoryStore::default();
    let job = JobService::new(&jobs, &repositories)
        .get(scope, id)
        .unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({ "action": "job.get", "job": job_json(&job) }));
    } else {
        let mut lines = vec![format!("aufait job get\n  {}", job_line(&job))];
        lines.extend(
            job.dependencies
                .iter()
                .map(|dep| format!("    {}@{}", dep.name, dep.version)),
        );
        println!("{}", lines.join("\n"));
    }
}

fn run_count(settings: &Settings, scope: &RequestScope, json: bool) {
    let jobs = load_jobs_or_exit(&settings.jobs);
    let repositories = MemoryRepositoryStore::default();
    let count = JobService::new(&jobs, &repositories)
        .count(scope)
        .unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({ "action": "job.count", "count": count }));
    } else {
        println!("{count}");
    }
}

fn run_delete(settings: &Settings, scope: &RequestScope, id: u64, json: bool) {
    let repositories = MemoryRepositoryStore::default();
    let removed = mutate_jsonl(&settings.jobs, |jobs: &mut MemoryJobStore| {
        let removed = JobService::new(&*jobs, &repositories).delete(scope, id)?;
        Ok::<_, ServiceError>((removed, true))
    })
    .unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({ "action": "job.delete", "job": job_json(&removed) }));
    } else {
        println!("aufait job delete\n  Deleted: {}", job_line(&removed));
    }
}

fn run_transition(settings: &Settings, scope: &RequestScope, id: u64, next: JobState, json: bool) {
    let repositories = MemoryRepositoryStore::default();
    let (previous, updated) = mutate_jsonl(&settings.jobs, |jobs: &mut MemoryJobStore| {
        let service = JobService::new(&*jobs, &repositories);
        let mut job = service.get(scope, id)?;
        let previous = job.state();
        job.transition(next)?;
        let updated = service.update(scope, id, job)?;
        Ok::<_, ServiceError>(((previous, updated), true))
    })
    .unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({
            "action": "job.transition",
            "from": previous.as_str(),
            "job": job_json(&updated)
        }));
    } else {
        println!(
            "aufait job transition\n  {} -> {}\n  {}",
            previous,
            updated.state(),
            job_line(&updated)
        );
    }
}
