//! Configuration loading from disk and environment.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Used when no `--config` flag is given. May be absent.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {var} value {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the environment, and validate.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
/// read if present and built-in defaults are used otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => read_file(path)?,
        None => match read_file(Path::new(DEFAULT_CONFIG_PATH)) {
            Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                AppConfig::default()
            }
            other => other?,
        },
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Environment takes precedence over the file: `PORT` replaces `server.port`.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
        config.server.port = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var: "PORT", value })?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_port_env_overrides_file() {
        let config = apply_env_overrides(AppConfig::default(), env(&[("PORT", "8088")])).unwrap();
        assert_eq!(config.server.port, 8088);
    }

    #[test]
    fn test_blank_port_env_is_ignored() {
        let config = apply_env_overrides(AppConfig::default(), env(&[("PORT", " ")])).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_bad_port_env_is_rejected() {
        let err = apply_env_overrides(AppConfig::default(), env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PORT", .. }));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/tarefas.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_file_reports_validation_errors() {
        let path = std::env::temp_dir().join(format!("tarefas-{}.toml", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[limits]\nmax_body_bytes = 0").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        fs::remove_file(&path).ok();
        match err {
            ConfigError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.field == "limits.max_body_bytes"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
