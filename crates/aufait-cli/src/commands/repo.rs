use aufait_engine::{RepositoryService, ServiceError};
use aufait_store::{MemoryRepositoryStore, Repository, RequestScope, mutate_jsonl};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::cli::RepoCommands;
use crate::config::Settings;
use crate::support::{
    exit_with_error, load_repositories_or_exit, print_json, repository_json, repository_line,
};

pub fn run(settings: &Settings, command: RepoCommands) {
    let scope = RequestScope::new("cli");
    match command {
        RepoCommands::Add { name, deps, json } => run_add(settings, &scope, name, deps, json),
        RepoCommands::Get { name, json } => run_get(settings, &scope, &name, json),
        RepoCommands::List {
            offset,
            limit,
            json,
        } => run_list(settings, &scope, offset, limit, json),
        RepoCommands::Count { json } => run_count(settings, &scope, json),
        RepoCommands::Delete { name, json } => run_delete(settings, &scope, &name, json),
        RepoCommands::Patch { file, json } => run_patch(settings, &scope, &file, json),
    }
}

fn parse_dep(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((package, constraint)) if !package.trim().is_empty() => {
            Ok((package.trim().to_string(), constraint.trim().to_string()))
        }
        _ => Err(format!("invalid --dep {raw:?}: expected package=constraint")),
    }
}

fn run_add(settings: &Settings, scope: &RequestScope, name: String, deps: Vec<String>, json: bool) {
    let mut repository = Repository::new(name);
    for raw in &deps {
        let (package, constraint) = parse_dep(raw).unwrap_or_else(|e| exit_with_error(e));
        repository = repository.with_dependency(package, constraint);
    }

    let created = mutate_jsonl(
        &settings.repositories,
        |store: &mut MemoryRepositoryStore| {
            let created = RepositoryService::new(&*store).create(scope, repository)?;
            Ok::<_, ServiceError>((created, true))
        },
    )
    .unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({
            "action": "repo.add",
            "repositoriesPath": settings.repositories.display().to_string(),
            "repository": repository_json(&created)
        }));
    } else {
        println!(
            "aufait repo add\n  Added: {}\n  Path: {}",
            repository_line(&created),
            settings.repositories.display()
        );
    }
}

fn run_get(settings: &Settings, scope: &RequestScope, name: &str, json: bool) {
    let store = load_repositories_or_exit(&settings.repositories);
    let repository = RepositoryService::new(&store)
        .get(scope, name)
        .unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({ "action": "repo.get", "repository": repository_json(&repository) }));
    } else {
        println!("{}", repository_line(&repository));
    }
}

fn run_list(settings: &Settings, scope: &RequestScope, offset: usize, limit: usize, json: bool) {
    let store = load_repositories_or_exit(&settings.repositories);
    let service = RepositoryService::new(&store);
    let rows = service
        .query(scope, offset, limit)
        .unwrap_or_else(|e| exit_with_error(e));
    let total = service.count(scope).unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({
            "action": "repo.list",
            "repositoriesPath": settings.repositories.display().to_string(),
            "total": total,
            "offset": offset,
            "items": rows.iter().map(repository_json).collect::<Vec<_>>()
        }));
    } else {
        let mut lines = vec![format!("aufait repo list ({} of {total})", rows.len())];
        lines.extend(rows.iter().map(|repo| format!("  {}", repository_line(repo))));
        println!("{}", lines.join("\n"));
    }
}

fn run_count(settings: &Settings, scope: &RequestScope, json: bool) {
    let store = load_repositories_or_exit(&settings.repositories);
    let count = RepositoryService::new(&store)
        .count(scope)
        .unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({ "action": "repo.count", "count": count }));
    } else {
        println!("{count}");
    }
}

fn run_delete(settings: &Settings, scope: &RequestScope, name: &str, json: bool) {
    let removed = mutate_jsonl(
        &settings.repositories,
        |store: &mut MemoryRepositoryStore| {
            let removed = RepositoryService::new(&*store).delete(scope, name)?;
            Ok::<_, ServiceError>((removed, true))
        },
    )
    .unwrap_or_else(|e| exit_with_error(e));

    if json {
        print_json(&json!({ "action": "repo.delete", "repository": repository_json(&removed) }));
    } else {
        println!("aufait repo delete\n  Deleted: {}", repository_line(&removed));
    }
}

fn run_patch(settings: &Settings, scope: &RequestScope, file: &str, json: bool) {
    let path = Path::new(file);
    let raw = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(format!("failed to read {}: {e}", path.display())));
    let patches: Vec<Repository> = serde_json::from_str(&raw)
        .unwrap_or_else(|e| exit_with_error(format!("failed to parse {}: {e}", path.display())));

    let outcome = mutate_jsonl(
        &settings.repositories,
        |store: &mut MemoryRepositoryStore| {
            let outcome = RepositoryService::new(&*store).patch(scope, patches)?;
            Ok::<_, ServiceError>((outcome, true))
        },
    )
    .unwrap_or_else(|e| exit_with_error(e));

    if json {
        let failures = outcome
            .failures
            .iter()
            .map(|failure| json!({ "name": failure.name, "error": failure.error.to_string() }))
            .collect::<Vec<_>>();
        print_json(&json!({
            "action": "repo.patch",
            "repositories": outcome.repositories.iter().map(repository_json).collect::<Vec<_>>(),
            "failures": failures
        }));
    } else {
        let mut lines = vec![format!(
            "aufait repo patch\n  Patched: {}\n  Failed: {}",
            outcome.repositories.len(),
            outcome.failures.len()
        )];
        lines.extend(
            outcome
                .repositories
                .iter()
                .map(|repo| format!("    ok   {}", repository_line(repo))),
        );
        lines.extend(
            outcome
                .failures
                .iter()
                .map(|failure| format!("    fail {}: {}", failure.name, failure.error)),
        );
        println!("{}", lines.join("\n"));
    }
}
