//! Version filter: which repositories does a published version affect?
//!
//! The engine only needs the [`VersionMatcher`] predicate. [`SemverMatcher`]
//! is the default and understands npm-style range syntax on top of the
//! `semver` crate.

use aufait_store::{PublishedEvent, Repository};
use semver::{Version, VersionReq};
use tracing::warn;

/// Pure predicate: does `version` satisfy `constraint`?
pub trait VersionMatcher {
    fn matches(&self, constraint: &str, version: &str) -> bool;
}

impl<F> VersionMatcher for F
where
    F: Fn(&str, &str) -> bool,
{
    fn matches(&self, constraint: &str, version: &str) -> bool {
        self(constraint, version)
    }
}

/// npm-flavoured semver ranges.
///
/// Supported: `^`, `~`, comparison operators (optionally separated from the
/// version by spaces), `x`/`*` wildcards, hyphen ranges `a - b`,
/// whitespace-joined comparator sets, `||` alternatives, and `latest`/empty
/// for "any". A bare version is an exact match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverMatcher;

impl VersionMatcher for SemverMatcher {
    fn matches(&self, constraint: &str, version: &str) -> bool {
        let version = match Version::parse(strip_v(version.trim())) {
            Ok(version) => version,
            Err(err) => {
                warn!(version, error = %err, "unparsable published version");
                return false;
            }
        };

        constraint
            .split("||")
            .any(|alternative| match parse_range(alternative) {
                Ok(requirement) => requirement.matches(&version),
                Err(err) => {
                    warn!(constraint, error = %err, "unparsable version constraint");
                    false
                }
            })
    }
}

/// Keep the repositories whose constraint for `event.name` accepts
/// `event.version`, preserving input order.
///
/// A repository that declares no constraint for the package is unaffected.
pub fn filter_by_version<M>(
    repositories: Vec<Repository>,
    event: &PublishedEvent,
    matcher: &M,
) -> Vec<Repository>
where
    M: VersionMatcher + ?Sized,
{
    repositories
        .into_iter()
        .filter(|repository| {
            repository
                .constraint_for(&event.name)
                .is_some_and(|constraint| matcher.matches(constraint, &event.version))
        })
        .collect()
}

fn parse_range(raw: &str) -> Result<VersionReq, semver::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "latest" {
        return Ok(VersionReq::STAR);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if let [low, "-", high] = tokens.as_slice() {
        return VersionReq::parse(&format!(">={}, <={}", strip_v(low), strip_v(high)));
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in tokens {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        let (op, rest) = split_operator(token);
        let op = format!("{pending_op}{op}");
        pending_op.clear();
        comparators.push(normalize_comparator(&op, strip_v(rest)));
    }

    VersionReq::parse(&comparators.join(", "))
}

fn split_operator(token: &str) -> (&str, &str) {
    let split = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    token.split_at(split)
}

/// `semver` treats a bare version as `^`; npm treats it as exact.
fn normalize_comparator(op: &str, version: &str) -> String {
    let is_wildcard = version
        .split('.')
        .any(|part| matches!(part, "x" | "X" | "*"));
    if op.is_empty() && !is_wildcard {
        format!("={version}")
    } else {
        format!("{op}{version}")
    }
}

fn strip_v(raw: &str) -> &str {
    raw.strip_prefix('v')
        .or_else(|| raw.strip_prefix('V'))
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn affected(constraint: &str, version: &str) -> bool {
        SemverMatcher.matches(constraint, version)
    }

    #[test]
    fn caret_and_tilde_follow_npm_semantics() {
        assert!(affected("^1.2.0", "1.4.7"));
        assert!(!affected("^1.2.0", "2.0.0"));
        assert!(affected("~1.2.0", "1.2.9"));
        assert!(!affected("~1.2.0", "1.3.0"));
    }

    #[test]
    fn bare_version_is_exact_match() {
        assert!(affected("1.2.3", "1.2.3"));
        assert!(!affected("1.2.3", "1.2.4"));
        assert!(affected("v1.2.3", "v1.2.3"));
    }

    #[test]
    fn comparator_sets_accept_spaced_operators() {
        assert!(affected(">=1.0.0 <2.0.0", "1.9.9"));
        assert!(!affected(">=1.0.0 <2.0.0", "2.0.0"));
        assert!(affected(">= 1.0.0 < 2", "1.5.0"));
    }

    #[test]
    fn alternatives_and_hyphen_ranges() {
        assert!(affected("~1.2.0 || ^3.0.0", "3.1.0"));
        assert!(!affected("~1.2.0 || ^3.0.0", "2.0.0"));
        assert!(affected("1.0.0 - 1.4.0", "1.4.0"));
        assert!(!affected("1.0.0 - 1.4.0", "1.4.1"));
    }

    #[test]
    fn wildcards_and_latest_match_everything_in_range() {
        assert!(affected("*", "9.9.9"));
        assert!(affected("latest", "0.0.1"));
        assert!(affected("1.x", "1.8.0"));
        assert!(!affected("1.x", "2.0.0"));
    }

    #[test]
    fn unparsable_inputs_are_not_affected() {
        assert!(!affected("not a range", "1.0.0"));
        assert!(!affected("^1.0.0", "one.two"));
    }

    #[test]
    fn filter_keeps_matching_repositories_in_input_order() {
        let repositories = vec![
            Repository::new("zeta").with_dependency("left-pad", "^1.0.0"),
            Repository::new("alpha").with_dependency("left-pad", "^2.0.0"),
            Repository::new("mid").with_dependency("left-pad", ">=1.0.0"),
            Repository::new("other").with_dependency("lodash", "*"),
        ];
        let event = PublishedEvent::new("left-pad", "1.2.3");

        let names: Vec<String> = filter_by_version(repositories, &event, &SemverMatcher)
            .into_iter()
            .map(|repository| repository.name)
            .collect();
        assert_eq!(names, vec!["zeta".to_string(), "mid".to_string()]);
    }

    #[test]
    fn filter_accepts_closure_matchers() {
        let repositories = vec![Repository::new("web-app").with_dependency("left-pad", "pinned")];
        let event = PublishedEvent::new("left-pad", "1.0.0");
        let always = |_: &str, _: &str| true;

        assert_eq!(filter_by_version(repositories, &event, &always).len(), 1);
    }
}
