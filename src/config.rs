//! Application-level configuration loading: listen port, storage backend and public URL.

use std::{env, fmt, fs, io::ErrorKind, path::Path, path::PathBuf, str::FromStr};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PICK_A_NUMBER_CONFIG_PATH";
const DEFAULT_PORT: u16 = 8080;

/// Where games are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map; games vanish on restart.
    #[default]
    Memory,
    /// MongoDB, configured through `MONGO_URI`/`MONGO_DB`.
    MongoDb,
    /// CouchDB, configured through `COUCH_BASE_URL` and friends.
    CouchDb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "couchdb" | "couch" => Ok(Self::CouchDb),
            other => Err(format!("unknown store backend `{other}`")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::MongoDb => "mongodb",
            Self::CouchDb => "couchdb",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// TCP port the HTTP server binds on all interfaces.
    pub port: u16,
    /// Storage backend for games.
    pub store: StoreBackend,
    /// Externally visible base URL used to build OpenID return addresses.
    pub public_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store: StoreBackend::default(),
            public_url: None,
        }
    }
}

impl AppConfig {
    /// Load the configuration file, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file(&resolve_config_path());
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    fn load_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), store = %config.store, "loaded config");
                    config
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

    /// `PORT` (or `SERVER_PORT`) and `STORE_BACKEND` take precedence over the file.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            match raw.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %raw, "ignoring invalid port override"),
            }
        }

        if let Some(raw) = lookup("STORE_BACKEND") {
            match raw.parse() {
                Ok(store) => self.store = store,
                Err(err) => warn!(error = %err, "ignoring invalid store backend override"),
            }
        }
    }
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
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"store": "couchdb"}"#).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.store, StoreBackend::CouchDb);
        assert_eq!(config.public_url, None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_file(Path::new("does/not/exist.json"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[("SERVER_PORT", "9000"), ("STORE_BACKEND", "Mongo")]));
        assert_eq!(config.port, 9000);
        assert_eq!(config.store, StoreBackend::MongoDb);

        config.apply_overrides(lookup(&[("PORT", "3000"), ("SERVER_PORT", "9001")]));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[("PORT", "eighty"), ("STORE_BACKEND", "redis")]));
        assert_eq!(config, AppConfig::default());
    }
}
