//! Attaching external databases to the connection.
//!
//! DuckDB's `mysql`, `postgres` and `sqlite` extensions expose a remote
//! database as an attached catalog; once attached its tables show up in
//! [`Engine::list_catalog`](crate::Engine::list_catalog) and can be queried
//! as `<profile>.<schema>.<table>`.

use crate::engine::{quote_identifier, quote_literal, Engine};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Kind of database a profile points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    #[default]
    MySql,
    Postgres,
    Sqlite,
}

impl RemoteKind {
    /// Name of the DuckDB extension and of the `ATTACH ... (TYPE x)` option.
    pub fn extension(&self) -> &'static str {
        match self {
            RemoteKind::MySql => "mysql",
            RemoteKind::Postgres => "postgres",
            RemoteKind::Sqlite => "sqlite",
        }
    }

    /// Conventional server port, `0` for file-based databases.
    pub fn default_port(&self) -> u16 {
        match self {
            RemoteKind::MySql => 3306,
            RemoteKind::Postgres => 5432,
            RemoteKind::Sqlite => 0,
        }
    }
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for RemoteKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(RemoteKind::MySql),
            "postgres" | "postgresql" | "pg" => Ok(RemoteKind::Postgres),
            "sqlite" | "sqlite3" => Ok(RemoteKind::Sqlite),
            other => Err(format!("unknown database type '{}'", other)),
        }
    }
}

/// A saved connection to an external database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Alias the database is attached under.
    pub name: String,
    #[serde(default)]
    pub db_type: RemoteKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    /// Database name, or the file path for SQLite.
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub ssl_ca: String,
    #[serde(default)]
    pub ssl_cert: String,
    #[serde(default)]
    pub ssl_key: String,
}

impl ConnectionProfile {
    /// A profile for `kind` with its default port and no credentials.
    pub fn new(name: impl Into<String>, kind: RemoteKind) -> Self {
        Self {
            name: name.into(),
            db_type: kind,
            host: if kind == RemoteKind::Sqlite {
                String::new()
            } else {
                "localhost".to_string()
            },
            port: kind.default_port(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            ssl_ca: String::new(),
            ssl_cert: String::new(),
            ssl_key: String::new(),
        }
    }

    /// True when any SSL file is configured.
    pub fn uses_ssl(&self) -> bool {
        !(self.ssl_ca.is_empty() && self.ssl_cert.is_empty() && self.ssl_key.is_empty())
    }

    /// The string passed to `ATTACH`.
    ///
    /// Server databases use libpq/MySQL style `key=value` pairs; empty
    /// optional fields are left out. SQLite uses the database path.
    pub fn connection_string(&self) -> String {
        if self.db_type == RemoteKind::Sqlite {
            return self.database.clone();
        }

        let mut parts = vec![
            format!("host={}", self.host),
            format!("port={}", self.port),
            format!("user={}", self.username),
        ];
        if !self.database.is_empty() {
            let key = match self.db_type {
                RemoteKind::Postgres => "dbname",
                _ => "database",
            };
            parts.push(format!("{}={}", key, self.database));
        }
        if !self.password.is_empty() {
            parts.push(format!("password={}", self.password));
        }
        let (ca, cert, key) = match self.db_type {
            RemoteKind::Postgres => ("sslrootcert", "sslcert", "sslkey"),
            _ => ("sslca", "sslcert", "sslkey"),
        };
        for (field, value) in [(ca, &self.ssl_ca), (cert, &self.ssl_cert), (key, &self.ssl_key)] {
            if !value.is_empty() {
                parts.push(format!("{}={}", field, value));
            }
        }
        parts.join(" ")
    }

    /// The full `ATTACH` statement for this profile.
    pub fn attach_sql(&self) -> String {
        format!(
            "ATTACH {} AS {} (TYPE {})",
            quote_literal(&self.connection_string()),
            quote_identifier(&self.name),
            self.db_type.extension()
        )
    }
}

impl Engine {
    /// Install and load the profile's extension, then attach the database.
    pub fn attach(&self, profile: &ConnectionProfile) -> Result<()> {
        if profile.name.trim().is_empty() {
            return Err(EngineError::InvalidName(
                "connection name must not be empty".to_string(),
            ));
        }
        let ext = profile.db_type.extension();
        self.execute_batch(&format!("INSTALL {ext}; LOAD {ext};"))?;
        // The statement carries the password; log the alias only.
        self.execute_batch(&profile.attach_sql()).map_err(|e| {
            warn!(connection = %profile.name, "Attach failed");
            EngineError::DuckDb(format!(
                "Failed to connect to {}: {}",
                profile.name,
                strip_credentials(&e.detail(), profile)
            ))
        })?;
        info!(
            connection = %profile.name,
            db_type = %profile.db_type,
            host = %profile.host,
            ssl = profile.uses_ssl(),
            "Database attached"
        );
        Ok(())
    }

    /// Detach a previously attached database.
    pub fn detach(&self, name: &str) -> Result<()> {
        self.execute_batch(&format!("DETACH {}", quote_identifier(name)))?;
        info!(connection = %name, "Database detached");
        Ok(())
    }

    /// Names of user-attached databases (excluding `memory`, `system` and `temp`).
    pub fn list_attached(&self) -> Result<Vec<String>> {
        let result = self.execute(
            "SELECT database_name FROM duckdb_databases() \
             WHERE NOT internal AND database_name <> 'memory' ORDER BY database_name",
        )?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.values.first())
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }
}

fn strip_credentials(message: &str, profile: &ConnectionProfile) -> String {
    if profile.password.is_empty() {
        message.to_string()
    } else {
        message.replace(&profile.password, "****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_connection_string() {
        let mut profile = ConnectionProfile::new("shop", RemoteKind::MySql);
        profile.username = "reader".into();
        assert_eq!(
            profile.connection_string(),
            "host=localhost port=3306 user=reader"
        );

        profile.database = "sales".into();
        profile.password = "pw".into();
        profile.ssl_ca = "/etc/ca.pem".into();
        assert_eq!(
            profile.connection_string(),
            "host=localhost port=3306 user=reader database=sales password=pw sslca=/etc/ca.pem"
        );
        assert!(profile.uses_ssl());
    }

    #[test]
    fn test_postgres_uses_dbname() {
        let mut profile = ConnectionProfile::new("wh", RemoteKind::Postgres);
        profile.database = "analytics".into();
        profile.username = "pg".into();
        assert_eq!(
            profile.connection_string(),
            "host=localhost port=5432 user=pg dbname=analytics"
        );
        assert_eq!(
            profile.attach_sql(),
            "ATTACH 'host=localhost port=5432 user=pg dbname=analytics' AS \"wh\" (TYPE postgres)"
        );
    }

    #[test]
    fn test_sqlite_uses_path() {
        let mut profile = ConnectionProfile::new("local", RemoteKind::Sqlite);
        profile.database = "/tmp/app's.db".into();
        assert_eq!(
            profile.attach_sql(),
            "ATTACH '/tmp/app''s.db' AS \"local\" (TYPE sqlite)"
        );
    }

    #[test]
    fn test_remote_kind_parse() {
        assert_eq!("MariaDB".parse::<RemoteKind>(), Ok(RemoteKind::MySql));
        assert_eq!("postgresql".parse::<RemoteKind>(), Ok(RemoteKind::Postgres));
        assert!("oracle".parse::<RemoteKind>().is_err());
    }

    #[test]
    fn test_detach_and_list_attached() {
        let engine = Engine::open_in_memory().unwrap();
        engine.execute_batch("ATTACH ':memory:' AS scratch").unwrap();
        assert_eq!(engine.list_attached().unwrap(), vec!["scratch"]);
        engine.detach("scratch").unwrap();
        assert!(engine.list_attached().unwrap().is_empty());
    }

    #[test]
    fn test_password_is_masked() {
        let mut profile = ConnectionProfile::new("x", RemoteKind::MySql);
        profile.password = "hunter2".into();
        assert_eq!(
            strip_credentials("bad password=hunter2", &profile),
            "bad password=****"
        );
    }
}
