use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DB: &str = "pick_a_number";

/// Where the CouchDB game store lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, e.g. `http://localhost:5984`.
    pub base_url: String,
    /// Database holding one document per game.
    pub database: String,
    /// Basic-auth user and password, only when both are set.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL`, `COUCH_DB` and optional `COUCH_USERNAME`/`COUCH_PASSWORD`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> CouchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;

        Ok(Self {
            base_url,
            database: lookup("COUCH_DB").unwrap_or_else(|| DEFAULT_DB.into()),
            credentials: lookup("COUCH_USERNAME").zip(lookup("COUCH_PASSWORD")),
        })
    }
}
