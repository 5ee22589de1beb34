//! Application-level configuration loading: queue defaults and operator tokens.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{dao::event_store::MAX_BATCH_OPERATIONS, state::wait::DEFAULT_SONG_MINUTES};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "KARAOKE_QUEUE_CONFIG_PATH";
/// Environment variable holding an extra operator token.
const OPERATOR_TOKEN_ENV: &str = "KARAOKE_OPERATOR_TOKEN";
const DEFAULT_CASCADE_BATCH_SIZE: usize = 400;
const DEFAULT_JOIN_CODE_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_song_minutes: f64,
    cascade_batch_size: usize,
    join_code_attempts: u32,
    operator_tokens: Vec<String>,
}

impl AppConfig {
    /// Load the configuration from disk, then append the operator token from the environment.
    pub fn load() -> Self {
        let config = Self::load_file();
        match env::var(OPERATOR_TOKEN_ENV) {
            Ok(token) => config.with_operator_token(token),
            Err(_) => config,
        }
    }

    fn load_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        operators = app_config.operator_tokens.len(),
                        cascade_batch_size = app_config.cascade_batch_size,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Register an additional operator token. Blank tokens are ignored.
    pub fn with_operator_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into().trim().to_owned();
        if !token.is_empty() && !self.operator_tokens.contains(&token) {
            self.operator_tokens.push(token);
        }
        self
    }

    /// Override the number of child requests deleted per cascade batch.
    pub fn with_cascade_batch_size(mut self, size: usize) -> Self {
        self.cascade_batch_size = clamp_batch_size(size);
        self
    }

    /// Whether `token` grants access to the operator surface.
    pub fn is_operator(&self, token: &str) -> bool {
        !token.is_empty() && self.operator_tokens.iter().any(|known| known == token)
    }

    /// Whether any operator token is configured at all.
    pub fn has_operators(&self) -> bool {
        !self.operator_tokens.is_empty()
    }

    /// Average song length applied to events created without one.
    pub fn default_song_minutes(&self) -> f64 {
        self.default_song_minutes
    }

    /// Child requests deleted per batch when an event is removed.
    pub fn cascade_batch_size(&self) -> usize {
        self.cascade_batch_size
    }

    /// Attempts made to find a join code not used by another active event.
    pub fn join_code_attempts(&self) -> u32 {
        self.join_code_attempts
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_song_minutes: DEFAULT_SONG_MINUTES,
            cascade_batch_size: DEFAULT_CASCADE_BATCH_SIZE,
            join_code_attempts: DEFAULT_JOIN_CODE_ATTEMPTS,
            operator_tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_song_minutes: Option<f64>,
    cascade_batch_size: Option<usize>,
    join_code_attempts: Option<u32>,
    operator_tokens: Vec<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let default_song_minutes = value
            .default_song_minutes
            .filter(|minutes| minutes.is_finite() && *minutes > 0.0)
            .unwrap_or(defaults.default_song_minutes);

        let config = Self {
            default_song_minutes,
            cascade_batch_size: value
                .cascade_batch_size
                .map(clamp_batch_size)
                .unwrap_or(defaults.cascade_batch_size),
            join_code_attempts: value
                .join_code_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.join_code_attempts),
            operator_tokens: Vec::new(),
        };

        value
            .operator_tokens
            .into_iter()
            .fold(config, Self::with_operator_token)
    }
}

fn clamp_batch_size(size: usize) -> usize {
    size.clamp(1, MAX_BATCH_OPERATIONS)
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_is_sanitized() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "defaultSongMinutes": -2,
                "cascadeBatchSize": 10000,
                "operatorTokens": ["secret", "  ", "secret"]
            }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.default_song_minutes(), DEFAULT_SONG_MINUTES);
        assert_eq!(config.cascade_batch_size(), MAX_BATCH_OPERATIONS);
        assert_eq!(config.join_code_attempts(), DEFAULT_JOIN_CODE_ATTEMPTS);
        assert!(config.is_operator("secret"));
        assert!(!config.is_operator(""));
        assert!(!config.is_operator("other"));
    }

    #[test]
    fn defaults_have_no_operator() {
        let config = AppConfig::default();
        assert!(!config.has_operators());
        assert_eq!(config.cascade_batch_size(), 400);
    }
}
