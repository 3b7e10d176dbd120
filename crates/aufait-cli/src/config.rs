//! Configuration: CLI flag > config file > built-in default.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

pub const DEFAULT_CONFIG_PATH: &str = ".aufait/config.toml";
pub const DEFAULT_JOBS_PATH: &str = ".aufait/jobs.jsonl";
pub const DEFAULT_REPOSITORIES_PATH: &str = ".aufait/repositories.jsonl";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    jobs: Option<PathBuf>,
    repositories: Option<PathBuf>,
    log: Option<String>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub jobs: PathBuf,
    pub repositories: PathBuf,
    pub log: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(String),

    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },
}

pub fn resolve(global: &GlobalArgs) -> Result<Settings, ConfigError> {
    let file = match global.config.as_deref() {
        Some(explicit) => {
            let path = Path::new(explicit);
            if !path.exists() {
                return Err(ConfigError::Missing(path.display().to_string()));
            }
            load_config_file(path)?
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config_file(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => ConfigFile::default(),
    };

    Ok(Settings {
        jobs: global
            .jobs
            .as_ref()
            .map(PathBuf::from)
            .or(file.jobs)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JOBS_PATH)),
        repositories: global
            .repositories
            .as_ref()
            .map(PathBuf::from)
            .or(file.repositories)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPOSITORIES_PATH)),
        log: global
            .log
            .clone()
            .or(file.log)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
    })
}

fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_config(prefix: &str, body: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("aufait-config-{prefix}-{unique}"));
        fs::create_dir_all(&root).expect("temp dir should be created");
        let path = root.join("config.toml");
        fs::write(&path, body).expect("config should be written");
        path
    }

    #[test]
    fn flags_override_config_file() {
        let path = temp_config(
            "override",
            "jobs = \"/srv/jobs.jsonl\"\nrepositories = \"/srv/repos.jsonl\"\nlog = \"debug\"\n",
        );
        let global = GlobalArgs {
            config: Some(path.display().to_string()),
            jobs: Some("local-jobs.jsonl".to_string()),
            repositories: None,
            log: None,
        };

        let settings = resolve(&global).expect("config should resolve");
        assert_eq!(settings.jobs, PathBuf::from("local-jobs.jsonl"));
        assert_eq!(settings.repositories, PathBuf::from("/srv/repos.jsonl"));
        assert_eq!(settings.log, "debug");
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let global = GlobalArgs {
            config: Some("/definitely/not/here/aufait.toml".to_string()),
            ..GlobalArgs::default()
        };
        assert!(matches!(resolve(&global), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let path = temp_config("unknown", "jobz = \"typo.jsonl\"\n");
        let global = GlobalArgs {
            config: Some(path.display().to_string()),
            ..GlobalArgs::default()
        };
        assert!(matches!(resolve(&global), Err(ConfigError::Parse { .. })));
    }
}
