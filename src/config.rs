//! Connection configuration and per-call statement options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Connection descriptor for one database instance.
///
/// Owned by the [`Service`](crate::service::Service) that was built from it
/// and immutable afterwards; per-task credential overrides travel in the
/// task parameters instead of mutating this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database kind ("mysql", "postgres", "oracle").
    pub kind: String,

    /// Database host.
    pub host: String,

    /// Database port.
    #[serde(default)]
    pub port: u16,

    /// Database/instance name.
    #[serde(default)]
    pub database: String,

    /// Username.
    pub username: String,

    /// Password. Never serialized.
    #[serde(skip_serializing, default)]
    pub password: String,

    /// Default owner/schema for browsing when none is given explicitly.
    #[serde(default)]
    pub owner: String,
}

impl DatabaseConfig {
    /// Load a configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: DatabaseConfig = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        if self.kind.trim().is_empty() {
            return Err(DbError::Config("database kind is required".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(DbError::Config("database host is required".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(DbError::Config("database username is required".to_string()));
        }
        Ok(())
    }
}

/// How generated DML renders row values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlRender {
    /// Parameter placeholders plus a bound-value list (for execution).
    #[default]
    Bind,
    /// Values inlined as SQL literals (for display/export files).
    Inline,
}

/// Per-call configuration for SQL generation and execution.
///
/// Immutable for the duration of a call; operations that need a different
/// setting clone and adjust rather than toggling shared state.
#[derive(Debug, Clone, Default)]
pub struct StatementOptions {
    /// Generate SQL for this dialect instead of the source connection's
    /// dialect (cross-dialect DDL export).
    pub target_kind: Option<String>,

    /// Qualify table identifiers with the owning schema.
    pub qualify_owner: bool,

    /// Prepend owner-create statements to generated DDL.
    pub include_owner_create: bool,

    /// Wrap multi-statement execution in a transaction.
    pub open_transaction: bool,

    /// Keep going after a failed statement instead of halting.
    pub continue_on_error: bool,

    /// Credential overrides for execution pools.
    pub exec_username: Option<String>,
    pub exec_password: Option<String>,

    /// Regenerate index names from owner/table/columns even when the index
    /// already carries a name.
    pub format_index_name: bool,
}

impl StatementOptions {
    /// Effective execution credentials, falling back to the config's.
    pub fn credentials<'a>(&'a self, config: &'a DatabaseConfig) -> (&'a str, &'a str) {
        (
            self.exec_username.as_deref().unwrap_or(&config.username),
            self.exec_password.as_deref().unwrap_or(&config.password),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> DatabaseConfig {
        DatabaseConfig {
            kind: "mysql".to_string(),
            host: "localhost".to_string(),
            port: 3306,
            database: "app".to_string(),
            username: "root".to_string(),
            password: "secret_password".to_string(),
            owner: "app".to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(make_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut config = make_config();
        config.kind = String::new();
        assert!(config.validate().is_err());

        let mut config = make_config();
        config.host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_password_not_serialized() {
        let json = serde_json::to_string(&make_config()).unwrap();
        assert!(
            !json.contains("secret_password"),
            "Password was serialized: {}",
            json
        );
    }

    #[test]
    fn test_credentials_fallback() {
        let config = make_config();
        let opts = StatementOptions::default();
        assert_eq!(opts.credentials(&config), ("root", "secret_password"));

        let opts = StatementOptions {
            exec_username: Some("ops".to_string()),
            exec_password: Some("other".to_string()),
            ..Default::default()
        };
        assert_eq!(opts.credentials(&config), ("ops", "other"));
    }
}
