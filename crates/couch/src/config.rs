//! Connection configuration.
//!
//! Configuration is resolved once at startup and then passed into the
//! connector. No environment variables are read during request handling;
//! [`CouchConfig::from_env`] exists for test harnesses and local tooling.

use pdr_core::{RepositoryError, RepositoryResult};
use url::Url;

const DEFAULT_URL: &str = "http://127.0.0.1:5984";
const DEFAULT_DATABASE: &str = "patients";

/// Basic-auth credentials for the store.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Connection settings for CouchDB and its couchdb-lucene plugin.
#[derive(Clone, Debug)]
pub struct CouchConfig {
    base_url: Url,
    database: String,
    credentials: Option<Credentials>,
}

impl CouchConfig {
    /// Creates a configuration for `database` on the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the database name is not a legal CouchDB
    /// database name (lowercase letter first, then lowercase letters, digits
    /// or `_$()+/-`).
    pub fn new(base_url: Url, database: impl Into<String>) -> RepositoryResult<Self> {
        let database = database.into();
        validate_database_name(&database)?;

        Ok(Self {
            base_url,
            database,
            credentials: None,
        })
    }

    /// Attaches basic-auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Builds a configuration from `COUCHDB_URL`, `COUCHDB_DATABASE`,
    /// `COUCHDB_USER` and `COUCHDB_PASSWORD`, falling back to a local
    /// unauthenticated store and the `patients` database.
    pub fn from_env() -> RepositoryResult<Self> {
        let raw_url =
            std::env::var("COUCHDB_URL").unwrap_or_else(|_| DEFAULT_URL.to_owned());
        let base_url = raw_url
            .parse::<Url>()
            .map_err(|e| RepositoryError::InvalidInput(format!("invalid COUCHDB_URL: {e}")))?;
        let database =
            std::env::var("COUCHDB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_owned());

        let mut config = Self::new(base_url, database)?;
        if let (Ok(username), Ok(password)) =
            (std::env::var("COUCHDB_USER"), std::env::var("COUCHDB_PASSWORD"))
        {
            config = config.with_credentials(username, password);
        }
        Ok(config)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

fn validate_database_name(name: &str) -> RepositoryResult<()> {
    let mut chars = name.chars();
    let legal_first = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let legal_rest = chars.all(|c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+/-".contains(c)
    });

    if legal_first && legal_rest {
        Ok(())
    } else {
        Err(RepositoryError::InvalidInput(format!(
            "illegal database name: {name}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        "http://127.0.0.1:5984".parse().unwrap()
    }

    #[test]
    fn test_accepts_legal_database_names() {
        for name in ["patients", "lucene-spike-db", "a1_$()+/-"] {
            assert!(CouchConfig::new(url(), name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_rejects_illegal_database_names() {
        for name in ["", "Patients", "1patients", "patients!"] {
            let result = CouchConfig::new(url(), name);
            assert!(
                matches!(result, Err(RepositoryError::InvalidInput(_))),
                "{name}"
            );
        }
    }

    #[test]
    fn test_credentials_are_optional() {
        let config = CouchConfig::new(url(), "patients").unwrap();
        assert!(config.credentials().is_none());

        let config = config.with_credentials("admin", "secret");
        assert_eq!(config.credentials().unwrap().username, "admin");
    }
}
