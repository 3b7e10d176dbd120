//! Repository type: a tracked codebase and the constraints it declares.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::validation::{ValidationError, check_name, check_version};

/// A tracked repository.
///
/// `dependencies` maps a package name to the version constraint the
/// repository declares for it (e.g. `"left-pad" -> "^1.2.0"`). The job
/// for a repository carries the repository's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

impl Repository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Builder-style helper to declare one constraint.
    pub fn with_dependency(
        mut self,
        package: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        self.dependencies.insert(package.into(), constraint.into());
        self
    }

    /// Declared constraint for `package`, if any.
    pub fn constraint_for(&self, package: &str) -> Option<&str> {
        self.dependencies.get(package).map(String::as_str)
    }

    pub fn depends_on(&self, package: &str) -> bool {
        self.dependencies.contains_key(package)
    }

    /// Overlay `other`'s declared constraints onto this repository.
    ///
    /// Returns whether any constraint changed.
    pub fn merge_constraints(&mut self, other: &Repository) -> bool {
        let mut changed = false;
        for (package, constraint) in &other.dependencies {
            if self.dependencies.get(package) != Some(constraint) {
                self.dependencies.insert(package.clone(), constraint.clone());
                changed = true;
            }
        }
        changed
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name("repository", "name", &self.name)?;
        for (package, constraint) in &self.dependencies {
            check_name("repository", "dependencies", package)?;
            check_version("repository", "dependencies", constraint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_lookup_is_per_package() {
        let repo = Repository::new("web-app")
            .with_dependency("left-pad", "^1.2.0")
            .with_dependency("lodash", "~4.17.0");

        assert_eq!(repo.constraint_for("left-pad"), Some("^1.2.0"));
        assert_eq!(repo.constraint_for("react"), None);
        assert!(repo.depends_on("lodash"));
    }

    #[test]
    fn merge_constraints_overrides_and_reports_change() {
        let mut repo = Repository::new("web-app").with_dependency("left-pad", "^1.0.0");
        let patch = Repository::new("web-app")
            .with_dependency("left-pad", "^2.0.0")
            .with_dependency("lodash", "*");

        assert!(repo.merge_constraints(&patch));
        assert_eq!(repo.constraint_for("left-pad"), Some("^2.0.0"));
        assert_eq!(repo.constraint_for("lodash"), Some("*"));
        assert!(!repo.merge_constraints(&patch), "reapplying is a no-op");
    }

    #[test]
    fn validate_rejects_blank_constraint() {
        let repo = Repository::new("web-app").with_dependency("left-pad", " ");
        assert!(matches!(
            repo.validate(),
            Err(ValidationError::Required {
                entity: "repository",
                ..
            })
        ));
    }
}
