use aufait_engine::{HookOutcome, JobAction, JobService, ReconcilePlan, ServiceError};
use aufait_store::{Job, MemoryJobStore, PublishedEvent, RequestScope, mutate_jsonl};
use serde_json::json;
use tracing::debug;

use crate::config::Settings;
use crate::support::{
    exit_with_error, job_json, job_line, load_jobs_or_exit, load_repositories_or_exit, print_json,
};

pub struct Args {
    pub package: String,
    pub version: String,
    pub actor: String,
    pub dry_run: bool,
    pub json: bool,
}

pub fn run(settings: &Settings, args: Args) {
    let scope = RequestScope::new(args.actor);
    let event = PublishedEvent::new(args.package, args.version);
    let repositories = load_repositories_or_exit(&settings.repositories);
    debug!(
        request_id = scope.request_id(),
        jobs = %settings.jobs.display(),
        repositories = %settings.repositories.display(),
        dry_run = args.dry_run,
        "handling publish hook"
    );

    if args.dry_run {
        let jobs = load_jobs_or_exit(&settings.jobs);
        let plan = JobService::new(&jobs, &repositories)
            .create_jobs_from_dependency(&scope, &event)
            .unwrap_or_else(|e| exit_with_error(e));
        render_plan(settings, &plan, None, args.json);
        return;
    }

    // Plan and apply under the jobs file lock; any failure leaves the file untouched.
    let outcome = mutate_jsonl(&settings.jobs, |jobs: &mut MemoryJobStore| {
        let outcome = JobService::new(&*jobs, &repositories).handle_hook(&scope, &event)?;
        let changed = !outcome.applied.is_empty();
        Ok::<_, ServiceError>((outcome, changed))
    })
    .unwrap_or_else(|e| exit_with_error(e));

    let HookOutcome { plan, applied } = outcome;
    let written: Vec<_> = applied.iter().map(|entry| &entry.job).collect();
    render_plan(settings, &plan, Some(written.as_slice()), args.json);
}

fn render_plan(
    settings: &Settings,
    plan: &ReconcilePlan,
    written: Option<&[&Job]>,
    json_output: bool,
) {
    if json_output {
        let actions = plan
            .actions
            .iter()
            .map(|action| {
                json!({
                    "action": action.kind(),
                    "repository": action.repository(),
                    "jobs": action.jobs().into_iter().map(job_json).collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();
        let payload = json!({
            "action": "hook",
            "jobsPath": settings.jobs.display().to_string(),
            "event": {
                "name": plan.event.name,
                "version": plan.event.version
            },
            "dryRun": written.is_none(),
            "actions": actions,
            "written": written.map(|jobs| jobs.iter().map(|job| job_json(job)).collect::<Vec<_>>())
        });
        print_json(&payload);
        return;
    }

    let mut lines = vec![
        "aufait hook".to_string(),
        format!("  Event: {}@{}", plan.event.name, plan.event.version),
        format!("  Actions: {}", plan.len()),
    ];
    for action in &plan.actions {
        lines.push(format!("  - {} {}", action.kind(), action.repository()));
        if let JobAction::LockAndFork { locked, .. } = action {
            lines.push(format!("      superseded: {}", job_line(locked)));
        }
    }
    match written {
        Some(jobs) => {
            lines.push(format!("  Jobs written: {}", jobs.len()));
            lines.extend(jobs.iter().map(|job| format!("      {}", job_line(job))));
        }
        None => lines.push("  Dry run: nothing written".to_string()),
    }
    lines.push(format!("  Path: {}", settings.jobs.display()));
    println!("{}", lines.join("\n"));
}
