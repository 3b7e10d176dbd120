//! Published dependency facts: the append-only history carried by a job.

use serde::{Deserialize, Serialize};

use crate::validation::{ValidationError, check_name, check_version};

/// One `{name, version}` publication fact attached to a job.
///
/// Facts are immutable once created. A job accumulates them over its life
/// and nothing in this crate deduplicates them by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublishedDependency {
    pub name: String,
    pub version: String,
}

impl PublishedDependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name("dependency", "name", &self.name)?;
        check_version("dependency", "version", &self.version)
    }
}
