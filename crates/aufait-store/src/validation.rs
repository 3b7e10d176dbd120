//! Structural validation shared by jobs, repositories and publish events.
//!
//! Validation runs before anything touches storage; a failing model is
//! reported to the caller and nothing is persisted.

use regex::Regex;
use std::sync::OnceLock;

/// Longest package/repository name accepted (npm registry limit).
pub const MAX_NAME_LEN: usize = 214;

/// Longest version or constraint string accepted.
pub const MAX_VERSION_LEN: usize = 256;

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9@_][A-Za-z0-9._/@~-]*$").expect("name regex must compile")
    })
}

/// A model failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{entity}.{field} is required")]
    Required {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity}.{field} is invalid: {value:?}")]
    Invalid {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{entity}.{field} exceeds {max} characters")]
    TooLong {
        entity: &'static str,
        field: &'static str,
        max: usize,
    },
}

/// Validate a package or repository name.
pub fn check_name(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { entity, field });
    }
    if value.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            entity,
            field,
            max: MAX_NAME_LEN,
        });
    }
    if !name_re().is_match(value) {
        return Err(ValidationError::Invalid {
            entity,
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate a version or constraint string: non-blank, bounded, single line.
pub fn check_version(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { entity, field });
    }
    if value.len() > MAX_VERSION_LEN {
        return Err(ValidationError::TooLong {
            entity,
            field,
            max: MAX_VERSION_LEN,
        });
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::Invalid {
            entity,
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_name_accepts_scoped_packages() {
        check_name("event", "name", "@babel/core").expect("scoped package name is valid");
        check_name("event", "name", "left-pad").expect("plain package name is valid");
    }

    #[test]
    fn check_name_rejects_blank_and_whitespace() {
        assert_eq!(
            check_name("job", "name", "  "),
            Err(ValidationError::Required {
                entity: "job",
                field: "name"
            })
        );
        assert!(matches!(
            check_name("job", "name", "left pad"),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn check_name_rejects_overlong_names() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            check_name("repository", "name", &long),
            Err(ValidationError::TooLong { max, .. }) if max == MAX_NAME_LEN
        ));
    }

    #[test]
    fn check_version_rejects_control_characters() {
        assert!(matches!(
            check_version("event", "version", "1.0.0\n2.0.0"),
            Err(ValidationError::Invalid { .. })
        ));
        check_version("event", "version", ">= 1.0.0 < 2").expect("ranges are free-form");
    }
}
