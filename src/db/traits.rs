//! Database abstraction traits
//!
//! [`UserLookup`] is the narrow interface the auth core consumes; the
//! [`TursoClient`](super::turso::TursoClient) implements it, tests mock it.
//! [`DatabaseProvider`] selects the libSQL backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use edudesk::db::DatabaseProvider;
//!
//! // Use in-memory database (default for development/testing)
//! let db = DatabaseProvider::Memory.create_client().await?;
//!
//! // Use file-based SQLite
//! let db = DatabaseProvider::SQLite { path: "data.db".into() }.create_client().await?;
//! ```

use crate::types::{Result, User};
use crate::utils::toml_config::DatabaseConfig;
use async_trait::async_trait;

/// Resolves users for authentication.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
}

#[async_trait]
impl UserLookup for super::turso::TursoClient {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email(email).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.get_user_by_id(id).await
    }
}

/// Database provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
    /// Remote Turso database (requires network access)
    #[cfg(feature = "turso")]
    Turso {
        /// The Turso database URL (e.g., `libsql://your-db.turso.io`)
        url: String,
        /// Authentication token for the Turso database
        auth_token: String,
    },
}

impl DatabaseProvider {
    /// Create a database client from this provider configuration
    pub async fn create_client(&self) -> Result<super::turso::TursoClient> {
        match self {
            DatabaseProvider::Memory => super::turso::TursoClient::new_memory().await,
            DatabaseProvider::SQLite { path } => super::turso::TursoClient::new_local(path).await,
            #[cfg(feature = "turso")]
            DatabaseProvider::Turso { url, auth_token } => {
                super::turso::TursoClient::new_remote(url.clone(), auth_token.clone()).await
            }
        }
    }

    /// Short backend name, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            DatabaseProvider::Memory => "memory",
            DatabaseProvider::SQLite { .. } => "sqlite",
            #[cfg(feature = "turso")]
            DatabaseProvider::Turso { .. } => "turso",
        }
    }

    /// Picks the backend from the `[database]` section.
    ///
    /// Turso credentials are read from the environment variables the section
    /// names; when they are unset the local path is used.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        #[cfg(feature = "turso")]
        {
            if let (Some(url_env), Some(token_env)) =
                (&config.turso_url_env, &config.turso_token_env)
            {
                if let (Ok(url), Ok(token)) = (std::env::var(url_env), std::env::var(token_env)) {
                    if !url.is_empty() && !token.is_empty() {
                        return DatabaseProvider::Turso {
                            url,
                            auth_token: token,
                        };
                    }
                }
            }
        }

        if config.url.is_empty() || config.url == ":memory:" {
            DatabaseProvider::Memory
        } else {
            DatabaseProvider::SQLite {
                path: config.url.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_config() {
        let mut config = DatabaseConfig::default();
        config.url = ":memory:".to_string();
        assert_eq!(DatabaseProvider::from_config(&config), DatabaseProvider::Memory);

        config.url = "./data/edudesk.db".to_string();
        assert_eq!(
            DatabaseProvider::from_config(&config),
            DatabaseProvider::SQLite {
                path: "./data/edudesk.db".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_memory_client_implements_lookup() {
        let client = DatabaseProvider::Memory
            .create_client()
            .await
            .expect("should create client");

        let lookup: &dyn UserLookup = &client;
        assert!(lookup
            .find_by_email("nobody@example.com")
            .await
            .expect("lookup should succeed")
            .is_none());
    }
}
