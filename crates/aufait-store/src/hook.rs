//! Inbound publish notification.

use serde::{Deserialize, Serialize};

use crate::dependency::PublishedDependency;
use crate::validation::{ValidationError, check_name, check_version};

/// A notification that package `name` reached `version`.
///
/// Transient: it is never persisted, only turned into job mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub name: String,
    pub version: String,
}

impl PublishedEvent {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name("event", "name", &self.name)?;
        check_version("event", "version", &self.version)
    }

    /// The dependency fact this event contributes to an affected job.
    pub fn to_dependency(&self) -> PublishedDependency {
        PublishedDependency::new(self.name.clone(), self.version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_dependency_copies_name_and_version() {
        let event = PublishedEvent::new("left-pad", "1.2.3");
        let dep = event.to_dependency();
        assert_eq!(dep.name, "left-pad");
        assert_eq!(dep.version, "1.2.3");
    }

    #[test]
    fn validate_rejects_missing_package_name() {
        let event = PublishedEvent::new("", "1.0.0");
        assert_eq!(
            event.validate(),
            Err(ValidationError::Required {
                entity: "event",
                field: "name"
            })
        );
    }
}
