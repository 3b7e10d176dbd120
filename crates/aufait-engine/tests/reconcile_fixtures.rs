//! Integration tests: golden reconciliation fixtures.
//!
//! Each fixture in tests/fixtures/ has:
//! - case.json: publish event, repositories, and pre-existing jobs
//! - expect.json: the planned actions and the job store after apply
//!
//! Jobs are projected to `{id, name, state, dependencies}` so timestamps
//! and revisions stay out of the comparison.

use aufait_engine::{JobAction, SemverMatcher, apply_plan, plan_for_event};
use aufait_store::{
    Job, MemoryJobStore, MemoryRepositoryStore, PublishedEvent, Repository, RequestScope,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;

#[derive(Deserialize)]
struct Case {
    event: PublishedEvent,
    repositories: Vec<Repository>,
    jobs: Vec<Job>,
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn project_job(job: &Job) -> Value {
    json!({
        "id": job.id,
        "name": job.name,
        "state": job.state().as_str(),
        "dependencies": job.dependencies,
    })
}

fn project_action(action: &JobAction) -> Value {
    json!({
        "action": action.kind(),
        "repository": action.repository(),
        "jobs": action.jobs().into_iter().map(project_job).collect::<Vec<_>>(),
    })
}

fn run_fixture(name: &str) {
    let dir = fixtures_dir().join(name);
    let case_path = dir.join("case.json");
    let expect_path = dir.join("expect.json");

    let case_str = std::fs::read_to_string(&case_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", case_path.display()));
    let expect_str = std::fs::read_to_string(&expect_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", expect_path.display()));

    let case: Case = serde_json::from_str(&case_str)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", case_path.display()));
    let expected: Value = serde_json::from_str(&expect_str)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", expect_path.display()));

    let scope = RequestScope::new("fixture").with_request_id(name);
    let jobs = MemoryJobStore::from_jobs(case.jobs)
        .unwrap_or_else(|e| panic!("fixture {name}: jobs failed to load: {e}"));
    let repositories = MemoryRepositoryStore::from_repositories(case.repositories);

    let plan = plan_for_event(&scope, &jobs, &repositories, &SemverMatcher, &case.event)
        .unwrap_or_else(|e| panic!("fixture {name}: plan failed: {e}"));
    apply_plan(&scope, &jobs, &plan)
        .unwrap_or_else(|e| panic!("fixture {name}: apply failed: {e}"));

    let store = jobs
        .snapshot()
        .unwrap_or_else(|e| panic!("fixture {name}: snapshot failed: {e}"));
    let actual = json!({
        "actions": plan.actions.iter().map(project_action).collect::<Vec<_>>(),
        "store": store.iter().map(project_job).collect::<Vec<_>>(),
    });

    assert_eq!(
        actual,
        expected,
        "\n\nFixture: {name}\n\nGot:\n{}\n\nExpected:\n{}\n",
        serde_json::to_string_pretty(&actual).unwrap_or_default(),
        serde_json::to_string_pretty(&expected).unwrap_or_default(),
    );
}

#[test]
fn golden_no_existing_job() {
    run_fixture("no_existing_job");
}

#[test]
fn golden_idle_job_merge() {
    run_fixture("idle_job_merge");
}

#[test]
fn golden_in_progress_lock_and_fork() {
    run_fixture("in_progress_lock_and_fork");
}

#[test]
fn golden_version_filter_excludes() {
    run_fixture("version_filter_excludes");
}
