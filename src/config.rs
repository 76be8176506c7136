use std::env;
use std::path::PathBuf;

use crate::insights::DASHBOARD_INSIGHT_LIMIT;

/// Runtime settings, read from `.env` and the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub user_id: String,
    pub log_level: String,
    pub insight_limit: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TRACKER_INSIGHT_LIMIT must be a positive integer, got '{0}'")]
    InvalidInsightLimit(String),
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("TRACKER_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let user_id = lookup("TRACKER_USER")
            .or_else(|| lookup("USER"))
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "default".to_string());

        let log_level = lookup("TRACKER_LOG").unwrap_or_else(|| "warn".to_string());

        let insight_limit = match lookup("TRACKER_INSIGHT_LIMIT") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ConfigError::InvalidInsightLimit(raw)),
            },
            None => DASHBOARD_INSIGHT_LIMIT,
        };

        Ok(Self {
            db_path,
            user_id,
            log_level,
            insight_limit,
        })
    }
}

fn default_db_path() -> PathBuf {
    // XDG data directory, or the working directory when there is no home
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "applytrack") {
        proj_dirs.data_dir().join("applytrack.db")
    } else {
        PathBuf::from("applytrack.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.user_id, "default");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.insight_limit, DASHBOARD_INSIGHT_LIMIT);
        assert!(config.db_path.ends_with("applytrack.db"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TRACKER_DB_PATH", "/tmp/jobs.db"),
            ("TRACKER_USER", "dana"),
            ("USER", "ignored"),
            ("TRACKER_LOG", "debug"),
            ("TRACKER_INSIGHT_LIMIT", "2"),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/jobs.db"));
        assert_eq!(config.user_id, "dana");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.insight_limit, 2);
    }

    #[test]
    fn test_user_falls_back_to_login_name() {
        let config = load(&[("USER", "lee")]).unwrap();
        assert_eq!(config.user_id, "lee");
    }

    #[test]
    fn test_rejects_bad_insight_limit() {
        assert!(matches!(
            load(&[("TRACKER_INSIGHT_LIMIT", "0")]),
            Err(ConfigError::InvalidInsightLimit(_))
        ));
        assert!(matches!(
            load(&[("TRACKER_INSIGHT_LIMIT", "lots")]),
            Err(ConfigError::InvalidInsightLimit(_))
        ));
    }
}
